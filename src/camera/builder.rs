use super::device::CaptureDevice;
use crate::config::CameraConfig;
use crate::error::{BarcamError, Result};
use std::sync::Arc;

/// Builder for the platform capture device
pub struct CaptureDeviceBuilder {
    config: Option<CameraConfig>,
}

impl CaptureDeviceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Arc<dyn CaptureDevice>> {
        let config = self
            .config
            .ok_or_else(|| BarcamError::system("Camera configuration must be specified"))?;

        Self::platform_device(config)
    }

    #[cfg(all(feature = "camera", target_os = "linux"))]
    fn platform_device(config: CameraConfig) -> Result<Arc<dyn CaptureDevice>> {
        Ok(Arc::new(super::gstreamer::GStreamerCamera::new(config)))
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    fn platform_device(config: CameraConfig) -> Result<Arc<dyn CaptureDevice>> {
        tracing::warn!(
            "Camera {} requested but GStreamer capture needs Linux and the camera feature",
            config.index
        );
        Err(crate::error::CameraError::NotAvailable {
            details: "built without the `camera` feature".to_string(),
        }
        .into())
    }
}

impl Default for CaptureDeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
