use crate::error::{BarcamError, Result};

/// Scan loop lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Sampling,
    Decoding,
    Succeeded,
    Cancelled,
    Failed,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Succeeded | ScanState::Cancelled | ScanState::Failed
        )
    }

    /// Whether the loop may move from `self` to `next`
    pub fn can_transition_to(&self, next: ScanState) -> bool {
        use ScanState::*;

        match (self, next) {
            (Idle, Sampling) => true,
            (Sampling, Decoding) => true,
            (Decoding, Sampling | Succeeded | Cancelled) => true,
            (Idle | Sampling | Decoding, Failed) => true,
            _ => false,
        }
    }
}

/// Terminal outcome of one scan session
#[derive(Debug)]
pub enum ScanResult {
    Decoded(String),
    Cancelled,
    Failed(BarcamError),
}

impl ScanResult {
    pub fn state(&self) -> ScanState {
        match self {
            ScanResult::Decoded(_) => ScanState::Succeeded,
            ScanResult::Cancelled => ScanState::Cancelled,
            ScanResult::Failed(_) => ScanState::Failed,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, ScanResult::Decoded(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanResult::Cancelled)
    }

    /// `Ok(Some(text))` on success, `Ok(None)` when cancelled
    pub fn into_result(self) -> Result<Option<String>> {
        match self {
            ScanResult::Decoded(text) => Ok(Some(text)),
            ScanResult::Cancelled => Ok(None),
            ScanResult::Failed(e) => Err(e),
        }
    }
}
