mod capture;
mod controller;

pub use capture::CaptureSession;
pub use controller::{DecoderFactory, ScanHandle, SessionController, SessionControllerBuilder};
