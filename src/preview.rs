use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Creates the on-screen surface that shows the live feed during a session
pub trait PreviewFactory: Send + Sync {
    fn create(&self, width: u32, height: u32) -> Box<dyn PreviewSurface>;
}

/// Session-owned preview surface. `close` hides and detaches it for good.
pub trait PreviewSurface: Send {
    fn show(&mut self);
    fn close(&mut self);
}

/// Headless preview: nothing is drawn
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewFactory for NoPreview {
    fn create(&self, width: u32, height: u32) -> Box<dyn PreviewSurface> {
        debug!("Headless preview for {}x{} feed", width, height);
        Box::new(NoPreview)
    }
}

impl PreviewSurface for NoPreview {
    fn show(&mut self) {}
    fn close(&mut self) {}
}

/// Counters recorded by [`RecordingPreview`]
#[derive(Debug, Default)]
pub struct PreviewStats {
    pub created: AtomicU32,
    pub shown: AtomicU32,
    pub closed: AtomicU32,
}

impl PreviewStats {
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn shown(&self) -> u32 {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    /// Surfaces created but not yet closed
    pub fn open(&self) -> u32 {
        self.created().saturating_sub(self.closed())
    }
}

/// Preview that only records its lifecycle, for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingPreview {
    stats: Arc<PreviewStats>,
}

impl RecordingPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<PreviewStats> {
        Arc::clone(&self.stats)
    }
}

impl PreviewFactory for RecordingPreview {
    fn create(&self, _width: u32, _height: u32) -> Box<dyn PreviewSurface> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingSurface {
            stats: Arc::clone(&self.stats),
            visible: false,
        })
    }
}

struct RecordingSurface {
    stats: Arc<PreviewStats>,
    visible: bool,
}

impl PreviewSurface for RecordingSurface {
    fn show(&mut self) {
        if !self.visible {
            self.visible = true;
            self.stats.shown.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn close(&mut self) {
        self.visible = false;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_preview_lifecycle() {
        let preview = RecordingPreview::new();
        let stats = preview.stats();

        let mut surface = preview.create(640, 480);
        surface.show();
        surface.show();
        assert_eq!(stats.created(), 1);
        assert_eq!(stats.shown(), 1);
        assert_eq!(stats.open(), 1);

        surface.close();
        assert_eq!(stats.closed(), 1);
        assert_eq!(stats.open(), 0);
    }
}
