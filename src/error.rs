use crate::frame::PixelLayout;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Faults raised by the capture device or while acquiring a frame from it
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to initialize capture device {device}: {details}")]
    DeviceInitFailed { device: String, details: String },

    #[error("Failed to grab frame: {details}")]
    FrameGrab { details: String },

    #[error("No frame received within {timeout:?}")]
    AcquisitionTimeout { timeout: Duration },

    #[error("Failed to release capture device: {details}")]
    Release { details: String },

    #[error("Capture device support is not available: {details}")]
    NotAvailable { details: String },
}

/// Faults in turning an encoded frame into decoder input
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Unable to load camera image: {details}")]
    BitmapDecodeFailed { details: String },

    #[error("Unsupported pixel layout: {layout:?}")]
    UnsupportedPixelLayout { layout: PixelLayout },

    #[error("Invalid pixel buffer size: expected {expected} bytes, got {actual}")]
    PixelBufferSize { expected: usize, actual: usize },
}

/// Session lifecycle faults
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A scan session is already active")]
    SessionAlreadyActive,

    #[error("No barcode found after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("Session ended without delivering a result")]
    ResultDropped,
}

impl BarcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// True when the error means a second session was refused
    pub fn is_session_already_active(&self) -> bool {
        matches!(self, Self::Session(SessionError::SessionAlreadyActive))
    }
}

pub type Result<T> = std::result::Result<T, BarcamError>;
