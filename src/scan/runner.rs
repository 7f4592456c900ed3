use super::state::{ScanResult, ScanState};
use crate::acquirer::FrameAcquirer;
use crate::barcode::BarcodeDecoder;
use crate::config::ScanConfig;
use crate::error::{BarcamError, Result, SessionError};
use crate::frame::NormalizedPixels;
use crate::normalizer::PixelNormalizer;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Drives repeated acquire → normalize → decode ticks until a terminal state
pub struct ScanLoop {
    state: ScanState,
    startup_delay: Duration,
    attempt_limit: Option<u32>,
    attempts: u32,
    history: Vec<ScanState>,
}

impl ScanLoop {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            state: ScanState::Idle,
            startup_delay: config.startup_delay(),
            attempt_limit: config.attempt_limit(),
            attempts: 0,
            history: vec![ScanState::Idle],
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Completed decode attempts
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Every state entered, in order, starting with `Idle`
    pub fn history(&self) -> &[ScanState] {
        &self.history
    }

    /// Run the loop to completion.
    ///
    /// `cancel` is only consulted after a decode attempt comes back empty, so an
    /// in-flight acquisition always finishes and gets its decode attempt.
    pub async fn run(
        &mut self,
        acquirer: &mut FrameAcquirer,
        decoder: Arc<dyn BarcodeDecoder>,
        cancel: &CancellationToken,
    ) -> ScanResult {
        match self.drive(acquirer, decoder, cancel).await {
            Ok(Some(text)) => {
                info!("Decoded after {} attempts: {}", self.attempts, text);
                ScanResult::Decoded(text)
            }
            Ok(None) => {
                info!("Cancelled after {} attempts", self.attempts);
                ScanResult::Cancelled
            }
            Err(e) => {
                error!("Scan failed after {} attempts: {}", self.attempts, e);
                self.transition(ScanState::Failed);
                ScanResult::Failed(e)
            }
        }
    }

    async fn drive(
        &mut self,
        acquirer: &mut FrameAcquirer,
        decoder: Arc<dyn BarcodeDecoder>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        if !self.startup_delay.is_zero() {
            trace!("Waiting {:?} for the capture pipeline", self.startup_delay);
            tokio::time::sleep(self.startup_delay).await;
        }

        loop {
            self.transition(ScanState::Sampling);
            let raw = acquirer.sample().await?;
            let pixels = PixelNormalizer::normalize_frame(raw)?;

            self.transition(ScanState::Decoding);
            let decoded = Self::attempt_decode(Arc::clone(&decoder), pixels).await?;
            self.attempts += 1;

            if let Some(text) = decoded.filter(|text| !text.is_empty()) {
                self.transition(ScanState::Succeeded);
                return Ok(Some(text));
            }

            if cancel.is_cancelled() {
                self.transition(ScanState::Cancelled);
                return Ok(None);
            }

            if let Some(limit) = self.attempt_limit {
                if self.attempts >= limit {
                    return Err(SessionError::AttemptsExhausted {
                        attempts: self.attempts,
                    }
                    .into());
                }
            }

            trace!("No barcode in attempt {}", self.attempts);
        }
    }

    /// Decode on the blocking pool; symbol decoding is CPU bound
    async fn attempt_decode(
        decoder: Arc<dyn BarcodeDecoder>,
        pixels: NormalizedPixels,
    ) -> Result<Option<String>> {
        debug!(
            "Decoding {}x{} {:?} frame",
            pixels.width, pixels.height, pixels.color_format
        );

        tokio::task::spawn_blocking(move || decoder.decode(&pixels))
            .await
            .map_err(|e| {
                BarcamError::component("decoder".to_string(), format!("decode task failed: {}", e))
            })
    }

    fn transition(&mut self, next: ScanState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid scan transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!("Scan state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}
