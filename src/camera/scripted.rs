use super::device::{CaptureDevice, DeviceHandle};
use crate::error::{CameraError, Result};
use crate::frame::EncodedFrame;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// One scripted response to a frame grab
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return these bytes as the next frame
    Frame(Vec<u8>),
    /// Fail the grab
    GrabError(String),
    /// Signal `entered`, then hold the grab until `release` is notified
    Gated {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        data: Vec<u8>,
    },
    /// Never complete the grab
    Stall,
}

/// Counters shared between a scripted camera and its handles
#[derive(Debug, Default)]
pub struct ScriptedCameraStats {
    pub initializations: AtomicU32,
    pub releases: AtomicU32,
    pub focus_requests: AtomicU32,
    pub grabs: AtomicU64,
}

impl ScriptedCameraStats {
    pub fn initializations(&self) -> u32 {
        self.initializations.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u32 {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn focus_requests(&self) -> u32 {
        self.focus_requests.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> u64 {
        self.grabs.load(Ordering::SeqCst)
    }
}

/// Capture device that plays back a fixed script, for tests and demos without hardware
pub struct ScriptedCamera {
    width: u32,
    height: u32,
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
    fallback: Option<Vec<u8>>,
    init_error: Option<String>,
    stats: Arc<ScriptedCameraStats>,
}

impl ScriptedCamera {
    pub fn new(width: u32, height: u32, steps: Vec<ScriptStep>) -> Self {
        Self {
            width,
            height,
            steps: Arc::new(Mutex::new(steps.into())),
            fallback: None,
            init_error: None,
            stats: Arc::new(ScriptedCameraStats::default()),
        }
    }

    /// A camera that returns the same frame forever
    pub fn repeating(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, Vec::new()).with_fallback(data)
    }

    /// Frame returned once the script runs out
    pub fn with_fallback(mut self, data: Vec<u8>) -> Self {
        self.fallback = Some(data);
        self
    }

    /// Make every `initialize` call fail
    pub fn failing_init<S: Into<String>>(mut self, details: S) -> Self {
        self.init_error = Some(details.into());
        self
    }

    /// Append steps, also after the camera has been handed out
    pub fn push_steps(&self, steps: impl IntoIterator<Item = ScriptStep>) {
        self.steps.lock().extend(steps);
    }

    pub fn stats(&self) -> Arc<ScriptedCameraStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl CaptureDevice for ScriptedCamera {
    fn name(&self) -> String {
        format!("scripted:{}x{}", self.width, self.height)
    }

    async fn initialize(&self) -> Result<Box<dyn DeviceHandle>> {
        if let Some(details) = &self.init_error {
            return Err(CameraError::DeviceInitFailed {
                device: self.name(),
                details: details.clone(),
            }
            .into());
        }

        self.stats.initializations.fetch_add(1, Ordering::SeqCst);
        debug!("Scripted camera initialized");

        Ok(Box::new(ScriptedHandle {
            width: self.width,
            height: self.height,
            steps: Arc::clone(&self.steps),
            fallback: self.fallback.clone(),
            stats: Arc::clone(&self.stats),
            frame_counter: 0,
        }))
    }
}

struct ScriptedHandle {
    width: u32,
    height: u32,
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
    fallback: Option<Vec<u8>>,
    stats: Arc<ScriptedCameraStats>,
    frame_counter: u64,
}

impl ScriptedHandle {
    fn frame(&mut self, data: Vec<u8>) -> EncodedFrame {
        let id = self.frame_counter;
        self.frame_counter += 1;
        EncodedFrame::new(id, data, self.width, self.height)
    }
}

#[async_trait]
impl DeviceHandle for ScriptedHandle {
    fn trigger_focus(&self) {
        self.stats.focus_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn video_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn grab_frame(&mut self) -> Result<EncodedFrame> {
        self.stats.grabs.fetch_add(1, Ordering::SeqCst);

        let step = self.steps.lock().pop_front();
        match step {
            Some(ScriptStep::Frame(data)) => Ok(self.frame(data)),
            Some(ScriptStep::GrabError(details)) => Err(CameraError::FrameGrab { details }.into()),
            Some(ScriptStep::Gated {
                entered,
                release,
                data,
            }) => {
                entered.notify_one();
                release.notified().await;
                Ok(self.frame(data))
            }
            Some(ScriptStep::Stall) => std::future::pending().await,
            None => match self.fallback.clone() {
                Some(data) => Ok(self.frame(data)),
                None => Err(CameraError::FrameGrab {
                    details: "script exhausted".to_string(),
                }
                .into()),
            },
        }
    }

    async fn release(&mut self) -> Result<()> {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        debug!("Scripted camera released");
        Ok(())
    }
}
