use crate::frame::{ColorFormat, NormalizedPixels};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

/// Barcode symbol decoder. Synchronous and pure: one attempt per call, no internal retry.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, pixels: &NormalizedPixels) -> Option<String>;
}

impl<F> BarcodeDecoder for F
where
    F: Fn(&NormalizedPixels) -> Option<String> + Send + Sync,
{
    fn decode(&self, pixels: &NormalizedPixels) -> Option<String> {
        self(pixels)
    }
}

#[cfg(feature = "qr")]
pub use qr::QrDecoder;

#[cfg(feature = "qr")]
mod qr {
    use super::BarcodeDecoder;
    use crate::frame::NormalizedPixels;
    use rqrr::PreparedImage;
    use tracing::{debug, trace};

    /// QR code decoder backed by rqrr; returns the first grid that decodes
    #[derive(Debug, Default, Clone, Copy)]
    pub struct QrDecoder;

    impl QrDecoder {
        pub fn new() -> Self {
            Self
        }
    }

    impl BarcodeDecoder for QrDecoder {
        fn decode(&self, pixels: &NormalizedPixels) -> Option<String> {
            let width = pixels.width as usize;
            let height = pixels.height as usize;

            let mut prepared =
                PreparedImage::prepare_from_greyscale(width, height, |x, y| pixels.luma(x, y));
            let grids = prepared.detect_grids();
            trace!("Found {} potential QR grids", grids.len());

            for grid in grids {
                match grid.decode() {
                    Ok((_, content)) => return Some(content),
                    Err(e) => debug!("Grid decode failed: {:?}", e),
                }
            }

            None
        }
    }
}

/// Decoder that replays scripted results, one per attempt, then reports nothing
pub struct ScriptedBarcodeDecoder {
    results: Mutex<VecDeque<Option<String>>>,
    attempts: AtomicU32,
    formats: Mutex<Vec<ColorFormat>>,
}

impl ScriptedBarcodeDecoder {
    pub fn new(results: Vec<Option<String>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            attempts: AtomicU32::new(0),
            formats: Mutex::new(Vec::new()),
        }
    }

    /// Decoder that never finds anything
    pub fn never() -> Self {
        Self::new(Vec::new())
    }

    /// Decoder that finds `text` on attempt `n` (1-based)
    pub fn on_attempt<S: Into<String>>(n: u32, text: S) -> Self {
        let mut results = vec![None; n.saturating_sub(1) as usize];
        results.push(Some(text.into()));
        Self::new(results)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Color formats seen, in attempt order
    pub fn formats(&self) -> Vec<ColorFormat> {
        self.formats.lock().clone()
    }
}

impl BarcodeDecoder for ScriptedBarcodeDecoder {
    fn decode(&self, pixels: &NormalizedPixels) -> Option<String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.formats.lock().push(pixels.color_format);
        self.results.lock().pop_front().flatten()
    }
}
