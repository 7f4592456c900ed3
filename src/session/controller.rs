use super::capture::CaptureSession;
use crate::barcode::BarcodeDecoder;
use crate::bitmap::BitmapDecoder;
use crate::camera::CaptureDevice;
use crate::config::ScanConfig;
use crate::error::{BarcamError, Result, SessionError};
use crate::preview::{NoPreview, PreviewFactory};
use crate::scan::ScanResult;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Creates the barcode decoder; called at most once per controller
pub type DecoderFactory = Arc<dyn Fn() -> Arc<dyn BarcodeDecoder> + Send + Sync>;

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
}

struct ControllerInner {
    config: ScanConfig,
    device: Arc<dyn CaptureDevice>,
    bitmap: Arc<dyn BitmapDecoder>,
    preview: Arc<dyn PreviewFactory>,
    decoder_factory: DecoderFactory,
    decoder: OnceLock<Arc<dyn BarcodeDecoder>>,
    active: Mutex<Option<ActiveSession>>,
}

impl ControllerInner {
    fn decoder(&self) -> Arc<dyn BarcodeDecoder> {
        let decoder = self.decoder.get_or_init(|| {
            info!("Creating barcode decoder");
            (self.decoder_factory)()
        });
        Arc::clone(decoder)
    }

    async fn run_session(&self, id: Uuid, cancel: CancellationToken) -> ScanResult {
        info!("Starting scan session");
        let decoder = self.decoder();

        let mut session = match CaptureSession::open(
            id,
            decoder,
            self.device.as_ref(),
            Arc::clone(&self.bitmap),
            self.preview.as_ref(),
            &self.config,
            cancel,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to open scan session: {}", e);
                return ScanResult::Failed(e);
            }
        };

        let result = session.run(&self.config).await;
        session.close().await;

        info!("Scan session finished: {:?}", result.state());
        result
    }

    fn clear_active(&self, id: Uuid) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|session| session.id == id) {
            *active = None;
            debug!("Session {} cleared", id);
        }
    }
}

/// Frees the active slot even if the session task unwinds
struct ActiveGuard {
    inner: Arc<ControllerInner>,
    id: Uuid,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.inner.clear_active(self.id);
    }
}

/// Starts and cancels scan sessions, one at a time.
///
/// The barcode decoder is created once per controller, not per process: clones
/// share it along with the active-session slot, while a separately built
/// controller creates its own.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }

    /// Start a session on the current tokio runtime.
    ///
    /// Fails with `SessionAlreadyActive` while another session is running; that
    /// session is left untouched.
    pub fn start(&self) -> Result<ScanHandle> {
        let (id, cancel) = {
            let mut active = self.inner.active.lock();
            if let Some(session) = active.as_ref() {
                warn!("Scan session {} is already active", session.id);
                return Err(SessionError::SessionAlreadyActive.into());
            }

            let id = Uuid::new_v4();
            let cancel = CancellationToken::new();
            *active = Some(ActiveSession {
                id,
                cancel: cancel.clone(),
            });
            (id, cancel)
        };

        let (tx, rx) = oneshot::channel();
        let guard = ActiveGuard {
            inner: Arc::clone(&self.inner),
            id,
        };

        tokio::spawn(
            async move {
                let result = guard.inner.run_session(id, cancel).await;
                drop(guard);

                if tx.send(result).is_err() {
                    debug!("Scan handle dropped before the outcome was delivered");
                }
            }
            .instrument(info_span!("scan_session", %id)),
        );

        Ok(ScanHandle { id, rx })
    }

    /// Start a session and report its outcome through callbacks.
    ///
    /// `on_success` receives `None` when the session was cancelled. Exactly one of
    /// the two callbacks runs, once.
    pub fn start_with_callbacks<S, E>(&self, on_success: S, on_error: E) -> Result<Uuid>
    where
        S: FnOnce(Option<String>) + Send + 'static,
        E: FnOnce(BarcamError) + Send + 'static,
    {
        let handle = self.start()?;
        let id = handle.id();

        tokio::spawn(async move {
            match handle.result().await.into_result() {
                Ok(text) => on_success(text),
                Err(e) => on_error(e),
            }
        });

        Ok(id)
    }

    /// Ask the active session to stop after its current decode attempt.
    ///
    /// Returns false when no session is active.
    pub fn cancel(&self) -> bool {
        match self.inner.active.lock().as_ref() {
            Some(session) => {
                info!("Cancel requested for session {}", session.id);
                session.cancel.cancel();
                true
            }
            None => {
                debug!("Cancel requested with no active session");
                false
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.lock().is_some()
    }

    pub fn active_session(&self) -> Option<Uuid> {
        self.inner.active.lock().as_ref().map(|session| session.id)
    }

    pub fn decoder_initialized(&self) -> bool {
        self.inner.decoder.get().is_some()
    }
}

/// Outcome of a started session
#[derive(Debug)]
pub struct ScanHandle {
    id: Uuid,
    rx: oneshot::Receiver<ScanResult>,
}

impl ScanHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the terminal outcome. Resources are already released when this returns.
    pub async fn result(self) -> ScanResult {
        self.rx
            .await
            .unwrap_or_else(|_| ScanResult::Failed(SessionError::ResultDropped.into()))
    }
}

/// Builder for [`SessionController`]
pub struct SessionControllerBuilder {
    config: Option<ScanConfig>,
    device: Option<Arc<dyn CaptureDevice>>,
    bitmap: Option<Arc<dyn BitmapDecoder>>,
    preview: Option<Arc<dyn PreviewFactory>>,
    decoder_factory: Option<DecoderFactory>,
}

impl SessionControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            device: None,
            bitmap: None,
            preview: None,
            decoder_factory: None,
        }
    }

    pub fn config(mut self, config: ScanConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn device(mut self, device: Arc<dyn CaptureDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn bitmap_decoder(mut self, bitmap: Arc<dyn BitmapDecoder>) -> Self {
        self.bitmap = Some(bitmap);
        self
    }

    pub fn preview(mut self, preview: Arc<dyn PreviewFactory>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn decoder_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn BarcodeDecoder> + Send + Sync + 'static,
    {
        self.decoder_factory = Some(Arc::new(factory));
        self
    }

    pub fn build(self) -> Result<SessionController> {
        let device = self
            .device
            .ok_or_else(|| BarcamError::system("Capture device must be specified"))?;

        let bitmap = match self.bitmap {
            Some(bitmap) => bitmap,
            None => Self::default_bitmap()?,
        };

        let decoder_factory = match self.decoder_factory {
            Some(factory) => factory,
            None => Self::default_decoder_factory()?,
        };

        let inner = ControllerInner {
            config: self.config.unwrap_or_default(),
            device,
            bitmap,
            preview: self.preview.unwrap_or_else(|| Arc::new(NoPreview)),
            decoder_factory,
            decoder: OnceLock::new(),
            active: Mutex::new(None),
        };

        Ok(SessionController {
            inner: Arc::new(inner),
        })
    }

    #[cfg(feature = "bitmap")]
    fn default_bitmap() -> Result<Arc<dyn BitmapDecoder>> {
        Ok(Arc::new(crate::bitmap::ImageBitmapDecoder::new()))
    }

    #[cfg(not(feature = "bitmap"))]
    fn default_bitmap() -> Result<Arc<dyn BitmapDecoder>> {
        Err(BarcamError::system(
            "Bitmap decoder must be specified when built without the `bitmap` feature",
        ))
    }

    #[cfg(feature = "qr")]
    fn default_decoder_factory() -> Result<DecoderFactory> {
        Ok(Arc::new(|| {
            Arc::new(crate::barcode::QrDecoder::new()) as Arc<dyn BarcodeDecoder>
        }))
    }

    #[cfg(not(feature = "qr"))]
    fn default_decoder_factory() -> Result<DecoderFactory> {
        Err(BarcamError::system(
            "Barcode decoder must be specified when built without the `qr` feature",
        ))
    }
}

impl Default for SessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
