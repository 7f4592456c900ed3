pub mod acquirer;
pub mod barcode;
pub mod bitmap;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod keyboard_input;
pub mod normalizer;
pub mod preview;
pub mod scan;
pub mod session;

pub use acquirer::FrameAcquirer;
pub use barcode::{BarcodeDecoder, ScriptedBarcodeDecoder};
pub use bitmap::{BitmapDecoder, RawBitmapDecoder};
pub use camera::{CaptureDevice, CaptureDeviceBuilder, DeviceHandle, ScriptStep, ScriptedCamera};
pub use config::{BarcamConfig, CameraConfig, ScanConfig};
pub use error::{BarcamError, CameraError, FrameError, Result, SessionError};
pub use frame::{
    AlphaMode, ColorFormat, EncodedFrame, NormalizedPixels, PixelBuffer, PixelLayout, RawFrame,
    Rotation,
};
pub use keyboard_input::KeyboardInputHandler;
pub use normalizer::PixelNormalizer;
pub use preview::{NoPreview, PreviewFactory, PreviewSurface, RecordingPreview};
pub use scan::{ScanLoop, ScanResult, ScanState};
pub use session::{CaptureSession, ScanHandle, SessionController, SessionControllerBuilder};

#[cfg(feature = "bitmap")]
pub use bitmap::ImageBitmapDecoder;

#[cfg(feature = "qr")]
pub use barcode::QrDecoder;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use camera::GStreamerCamera;
