mod builder;
mod device;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod gstreamer;
mod scripted;

pub use builder::CaptureDeviceBuilder;
pub use device::{CaptureDevice, DeviceHandle};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gstreamer::GStreamerCamera;
pub use scripted::{ScriptStep, ScriptedCamera, ScriptedCameraStats};
