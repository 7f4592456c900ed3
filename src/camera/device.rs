use crate::error::Result;
use crate::frame::EncodedFrame;
use async_trait::async_trait;

/// A camera that can be opened once per scan session
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Human-readable device name used in logs and errors
    fn name(&self) -> String;

    /// Open the device and start its live feed
    async fn initialize(&self) -> Result<Box<dyn DeviceHandle>>;
}

/// An opened capture device, owned by exactly one session
#[async_trait]
pub trait DeviceHandle: Send {
    /// Ask the device to refocus. Fire-and-forget: implementations must not block
    /// and must swallow their own failures.
    fn trigger_focus(&self);

    /// Current live video dimensions
    fn video_dimensions(&self) -> (u32, u32);

    /// Copy the current live frame out as an encoded byte stream
    async fn grab_frame(&mut self) -> Result<EncodedFrame>;

    /// Stop the live feed and give the device back to the system
    async fn release(&mut self) -> Result<()>;
}
