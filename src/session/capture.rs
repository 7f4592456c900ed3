use crate::acquirer::FrameAcquirer;
use crate::barcode::BarcodeDecoder;
use crate::bitmap::BitmapDecoder;
use crate::camera::CaptureDevice;
use crate::config::ScanConfig;
use crate::error::Result;
use crate::preview::{PreviewFactory, PreviewSurface};
use crate::scan::{ScanLoop, ScanResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// State owned by one scan session, from device init to terminal outcome.
///
/// The decoder is shared with the controller; the device handle and preview
/// surface belong to this session only and are released by [`close`](Self::close).
pub struct CaptureSession {
    id: Uuid,
    decoder: Arc<dyn BarcodeDecoder>,
    acquirer: FrameAcquirer,
    preview: Option<Box<dyn PreviewSurface>>,
    visible: bool,
    cancel: CancellationToken,
}

impl CaptureSession {
    /// Initialize a fresh device handle and put up the preview
    pub async fn open(
        id: Uuid,
        decoder: Arc<dyn BarcodeDecoder>,
        device: &dyn CaptureDevice,
        bitmap: Arc<dyn BitmapDecoder>,
        preview: &dyn PreviewFactory,
        config: &ScanConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let acquirer = FrameAcquirer::open(device, bitmap, config).await?;

        let (width, height) = acquirer.video_dimensions();
        debug!("Creating preview for {}x{} feed", width, height);
        let mut surface = preview.create(width, height);
        surface.show();

        info!("Session {} opened on {}", id, device.name());

        Ok(Self {
            id,
            decoder,
            acquirer,
            preview: Some(surface),
            visible: true,
            cancel,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn preview_present(&self) -> bool {
        self.preview.is_some()
    }

    /// Run the scan loop until it reaches a terminal state
    pub async fn run(&mut self, config: &ScanConfig) -> ScanResult {
        let mut scan = ScanLoop::new(config);
        scan.run(&mut self.acquirer, Arc::clone(&self.decoder), &self.cancel)
            .await
    }

    /// Hide and detach the preview, then release the device.
    ///
    /// Release failures are logged; the session outcome stands.
    pub async fn close(&mut self) {
        if let Some(mut surface) = self.preview.take() {
            debug!("Closing preview");
            surface.close();
        }
        self.visible = false;

        if let Err(e) = self.acquirer.release().await {
            warn!("Failed to release capture device for session {}: {}", self.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::ScriptedBarcodeDecoder;
    use crate::bitmap::RawBitmapDecoder;
    use crate::camera::ScriptedCamera;
    use crate::frame::{AlphaMode, PixelLayout};
    use crate::preview::RecordingPreview;

    fn scan_config() -> ScanConfig {
        ScanConfig {
            startup_delay_ms: 0,
            ..ScanConfig::default()
        }
    }

    async fn open_session(
        camera: &ScriptedCamera,
        preview: &RecordingPreview,
        decoder: ScriptedBarcodeDecoder,
    ) -> CaptureSession {
        CaptureSession::open(
            Uuid::new_v4(),
            Arc::new(decoder),
            camera,
            Arc::new(RawBitmapDecoder::new(PixelLayout::Rgba8, AlphaMode::Ignore)),
            preview,
            &scan_config(),
            CancellationToken::new(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_open_shows_preview() {
        let camera = ScriptedCamera::repeating(2, 1, vec![0; 8]);
        let preview = RecordingPreview::new();
        let stats = preview.stats();

        let session = open_session(&camera, &preview, ScriptedBarcodeDecoder::never()).await;

        assert!(session.is_visible());
        assert!(session.preview_present());
        assert!(!session.is_cancelled());
        assert_eq!(stats.shown(), 1);
        assert_eq!(stats.open(), 1);
    }

    #[tokio::test]
    async fn test_close_releases_everything_once() {
        let camera = ScriptedCamera::repeating(1, 1, vec![0; 4]);
        let camera_stats = camera.stats();
        let preview = RecordingPreview::new();
        let preview_stats = preview.stats();

        let mut session =
            open_session(&camera, &preview, ScriptedBarcodeDecoder::on_attempt(2, "OK")).await;
        let result = session.run(&scan_config()).await;
        assert_eq!(result.into_result().unwrap(), Some("OK".to_string()));

        session.close().await;
        session.close().await;

        assert!(!session.is_visible());
        assert!(!session.preview_present());
        assert_eq!(preview_stats.closed(), 1);
        assert_eq!(camera_stats.releases(), 1);
    }
}
