use super::device::{CaptureDevice, DeviceHandle};
use crate::config::CameraConfig;
use crate::error::{BarcamError, CameraError, Result};
use crate::frame::{EncodedFrame, Rotation};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// How long a single blocking pull waits before the grab gives up
const PULL_TIMEOUT: Duration = Duration::from_secs(10);

/// V4L2 camera driven through a GStreamer pipeline that JPEG-encodes the live feed
pub struct GStreamerCamera {
    config: CameraConfig,
}

impl GStreamerCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }

    fn device_path(&self) -> String {
        format!("/dev/video{}", self.config.index)
    }

    /// Build the pipeline description, including the preview rotation if configured
    fn build_pipeline_string(&self) -> String {
        let (width, height) = self.config.resolution;
        let flip = match self.config.preview_rotation {
            Some(Rotation::Rotate90) => "videoflip method=clockwise ! ",
            Some(Rotation::Rotate180) => "videoflip method=rotate-180 ! ",
            Some(Rotation::Rotate270) => "videoflip method=counterclockwise ! ",
            None => "",
        };

        format!(
            "v4l2src name=src device={} ! \
             video/x-raw,width={},height={},framerate={}/1 ! \
             videoconvert ! {}jpegenc quality=90 ! \
             appsink name=sink sync=false max-buffers=1 drop=true enable-last-sample=false",
            self.device_path(),
            width,
            height,
            self.config.fps,
            flip
        )
    }

    fn init_error(&self, details: String) -> BarcamError {
        CameraError::DeviceInitFailed {
            device: self.device_path(),
            details,
        }
        .into()
    }
}

#[async_trait]
impl CaptureDevice for GStreamerCamera {
    fn name(&self) -> String {
        self.device_path()
    }

    async fn initialize(&self) -> Result<Box<dyn DeviceHandle>> {
        info!(
            "Initializing GStreamer capture for {} ({}x{} @ {}fps)",
            self.device_path(),
            self.config.resolution.0,
            self.config.resolution.1,
            self.config.fps
        );

        gstreamer::init().map_err(|e| self.init_error(format!("GStreamer init: {}", e)))?;

        let pipeline_desc = self.build_pipeline_string();
        debug!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| self.init_error(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| self.init_error("Failed to downcast to Pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .and_then(|element| element.downcast::<AppSink>().ok())
            .ok_or_else(|| self.init_error("Pipeline has no appsink".to_string()))?;

        let source = pipeline
            .by_name("src")
            .ok_or_else(|| self.init_error("Pipeline has no v4l2src".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| self.init_error(format!("Failed to start pipeline: {}", e)))?;

        info!("GStreamer pipeline started for {}", self.device_path());

        Ok(Box::new(GStreamerHandle {
            pipeline,
            appsink,
            source,
            resolution: self.config.resolution,
            frame_counter: 0,
        }))
    }
}

struct GStreamerHandle {
    pipeline: Pipeline,
    appsink: AppSink,
    source: gstreamer::Element,
    resolution: (u32, u32),
    frame_counter: u64,
}

#[async_trait]
impl DeviceHandle for GStreamerHandle {
    fn trigger_focus(&self) {
        if self.source.find_property("extra-controls").is_none() {
            trace!("Capture source has no extra-controls; skipping focus");
            return;
        }

        let controls = gstreamer::Structure::builder("c")
            .field("focus_automatic_continuous", 1i32)
            .build();
        self.source.set_property("extra-controls", controls);
    }

    fn video_dimensions(&self) -> (u32, u32) {
        self.resolution
    }

    async fn grab_frame(&mut self) -> Result<EncodedFrame> {
        let appsink = self.appsink.clone();

        let sample = tokio::task::spawn_blocking(move || {
            appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(
                PULL_TIMEOUT.as_millis() as u64,
            ))
        })
        .await
        .map_err(|e| CameraError::FrameGrab {
            details: format!("Pull task failed: {}", e),
        })?
        .ok_or_else(|| CameraError::FrameGrab {
            details: "No sample available from appsink".to_string(),
        })?;

        let buffer = sample.buffer().ok_or_else(|| CameraError::FrameGrab {
            details: "No buffer in sample".to_string(),
        })?;

        let (width, height) = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .and_then(|s| {
                let width = s.get::<i32>("width").ok()?;
                let height = s.get::<i32>("height").ok()?;
                Some((width as u32, height as u32))
            })
            .unwrap_or(self.resolution);
        self.resolution = (width, height);

        let map = buffer.map_readable().map_err(|e| CameraError::FrameGrab {
            details: format!("Failed to map buffer: {}", e),
        })?;

        let id = self.frame_counter;
        self.frame_counter += 1;

        trace!(
            "Grabbed JPEG frame {} ({}x{}, {} bytes)",
            id,
            width,
            height,
            map.len()
        );

        Ok(EncodedFrame::new(id, map.as_slice().to_vec(), width, height))
    }

    async fn release(&mut self) -> Result<()> {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop GStreamer pipeline: {}", e);
            return Err(CameraError::Release {
                details: format!("Failed to stop pipeline: {}", e),
            }
            .into());
        }

        info!("GStreamer pipeline stopped");
        Ok(())
    }
}
