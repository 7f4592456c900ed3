use crate::bitmap::BitmapDecoder;
use crate::camera::{CaptureDevice, DeviceHandle};
use crate::config::ScanConfig;
use crate::error::{CameraError, FrameError, Result};
use crate::frame::RawFrame;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, trace};

/// Owns an opened capture device for one session and turns each tick into a decoded bitmap
pub struct FrameAcquirer {
    handle: Box<dyn DeviceHandle>,
    bitmap: Arc<dyn BitmapDecoder>,
    frame_timeout: Option<Duration>,
    continuous_focus: bool,
    samples: u64,
    released: bool,
}

impl FrameAcquirer {
    /// Initialize the device and take ownership of its handle
    pub async fn open(
        device: &dyn CaptureDevice,
        bitmap: Arc<dyn BitmapDecoder>,
        config: &ScanConfig,
    ) -> Result<Self> {
        info!("Initializing capture device {}", device.name());
        let handle = device.initialize().await?;
        info!("Capture device {} initialized", device.name());

        Ok(Self::with_handle(handle, bitmap, config))
    }

    pub fn with_handle(
        handle: Box<dyn DeviceHandle>,
        bitmap: Arc<dyn BitmapDecoder>,
        config: &ScanConfig,
    ) -> Self {
        Self {
            handle,
            bitmap,
            frame_timeout: config.frame_timeout(),
            continuous_focus: config.continuous_focus,
            samples: 0,
            released: false,
        }
    }

    pub fn video_dimensions(&self) -> (u32, u32) {
        self.handle.video_dimensions()
    }

    /// Number of frames sampled so far
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Grab one frame and decode it into raw pixels
    pub async fn sample(&mut self) -> Result<RawFrame> {
        debug!("Sampling");

        if self.continuous_focus {
            self.handle.trigger_focus();
        }

        let grab = self.handle.grab_frame();
        let frame = match self.frame_timeout {
            Some(limit) => timeout(limit, grab)
                .await
                .map_err(|_| CameraError::AcquisitionTimeout { timeout: limit })??,
            None => grab.await?,
        };
        self.samples += 1;

        trace!(
            "Loading stream for frame {} ({}x{}, {} bytes)",
            frame.id,
            frame.width,
            frame.height,
            frame.data.len()
        );

        let frame_id = frame.id;
        let byte_count = frame.data.len();
        let raw = self.bitmap.decode(frame).await?.ok_or_else(|| {
            FrameError::BitmapDecodeFailed {
                details: format!("frame {} ({} bytes) did not decode", frame_id, byte_count),
            }
        })?;

        debug!(
            "Pixel data detached: {:?}/{:?} {}x{}",
            raw.pixel_layout, raw.alpha_mode, raw.width, raw.height
        );

        Ok(raw)
    }

    /// Release the device. Safe to call more than once.
    pub async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        debug!("Releasing capture device after {} samples", self.samples);
        self.handle.release().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::RawBitmapDecoder;
    use crate::camera::{ScriptStep, ScriptedCamera};
    use crate::error::BarcamError;
    use crate::frame::{AlphaMode, PixelLayout};

    fn scan_config(frame_timeout_ms: u64) -> ScanConfig {
        ScanConfig {
            startup_delay_ms: 0,
            frame_timeout_ms,
            max_attempts: 0,
            continuous_focus: true,
        }
    }

    fn raw_decoder() -> Arc<dyn BitmapDecoder> {
        Arc::new(RawBitmapDecoder::new(PixelLayout::Rgba8, AlphaMode::Straight))
    }

    #[tokio::test]
    async fn test_sample_decodes_frame_and_requests_focus() {
        let camera = ScriptedCamera::new(1, 1, vec![ScriptStep::Frame(vec![1, 2, 3, 4])]);
        let stats = camera.stats();

        let mut acquirer = FrameAcquirer::open(&camera, raw_decoder(), &scan_config(1000))
            .await
            .unwrap();
        let raw = acquirer.sample().await.unwrap();

        assert_eq!(raw.pixel_layout, PixelLayout::Rgba8);
        assert_eq!(raw.bytes, vec![1, 2, 3, 4]);
        assert_eq!(acquirer.samples(), 1);
        assert_eq!(stats.focus_requests(), 1);
    }

    #[tokio::test]
    async fn test_focus_can_be_disabled() {
        let camera = ScriptedCamera::repeating(1, 1, vec![0; 4]);
        let stats = camera.stats();
        let config = ScanConfig {
            continuous_focus: false,
            ..scan_config(0)
        };

        let mut acquirer = FrameAcquirer::open(&camera, raw_decoder(), &config)
            .await
            .unwrap();
        acquirer.sample().await.unwrap();

        assert_eq!(stats.focus_requests(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_frame_is_fatal() {
        let camera = ScriptedCamera::new(1, 1, vec![ScriptStep::Frame(Vec::new())]);

        let mut acquirer = FrameAcquirer::open(&camera, raw_decoder(), &scan_config(1000))
            .await
            .unwrap();

        match acquirer.sample().await {
            Err(BarcamError::Frame(FrameError::BitmapDecodeFailed { .. })) => {}
            other => panic!("Expected BitmapDecodeFailed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_grab_times_out() {
        let camera = ScriptedCamera::new(1, 1, vec![ScriptStep::Stall]);

        let mut acquirer = FrameAcquirer::open(&camera, raw_decoder(), &scan_config(250))
            .await
            .unwrap();

        match acquirer.sample().await {
            Err(BarcamError::Camera(CameraError::AcquisitionTimeout { timeout })) => {
                assert_eq!(timeout, Duration::from_millis(250));
            }
            other => panic!("Expected AcquisitionTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let camera = ScriptedCamera::repeating(1, 1, vec![0; 4]);
        let stats = camera.stats();

        let mut acquirer = FrameAcquirer::open(&camera, raw_decoder(), &scan_config(0))
            .await
            .unwrap();
        acquirer.release().await.unwrap();
        acquirer.release().await.unwrap();

        assert_eq!(stats.releases(), 1);
    }
}
