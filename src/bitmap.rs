//! Bitmap decoding: turns an encoded frame grabbed from the device into raw pixels
//! tagged with the layout and alpha mode the decoder produced.

use crate::error::Result;
use crate::frame::{AlphaMode, EncodedFrame, PixelLayout, RawFrame};
use async_trait::async_trait;
use tracing::debug;

/// Decodes an encoded frame stream into raw pixels.
///
/// `Ok(None)` means the stream could not be turned into a bitmap at all.
#[async_trait]
pub trait BitmapDecoder: Send + Sync {
    async fn decode(&self, frame: EncodedFrame) -> Result<Option<RawFrame>>;
}

/// Treats the frame bytes as already-decoded pixels of a fixed layout.
///
/// Suits devices that deliver raw video (and tests). Empty frames decode to nothing.
pub struct RawBitmapDecoder {
    layout: PixelLayout,
    alpha_mode: AlphaMode,
}

impl RawBitmapDecoder {
    pub fn new(layout: PixelLayout, alpha_mode: AlphaMode) -> Self {
        Self { layout, alpha_mode }
    }
}

#[async_trait]
impl BitmapDecoder for RawBitmapDecoder {
    async fn decode(&self, frame: EncodedFrame) -> Result<Option<RawFrame>> {
        if frame.data.is_empty() {
            debug!("Frame {} is empty", frame.id);
            return Ok(None);
        }

        Ok(Some(RawFrame::new(
            self.layout,
            self.alpha_mode,
            frame.width,
            frame.height,
            frame.data,
        )))
    }
}

#[cfg(feature = "bitmap")]
pub use image_decoder::ImageBitmapDecoder;

#[cfg(feature = "bitmap")]
mod image_decoder {
    use super::BitmapDecoder;
    use crate::error::{BarcamError, Result};
    use crate::frame::{AlphaMode, EncodedFrame, PixelLayout, RawFrame};
    use async_trait::async_trait;
    use image::DynamicImage;
    use tracing::{debug, trace};

    /// Decodes JPEG/PNG/... streams with the `image` crate
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ImageBitmapDecoder;

    impl ImageBitmapDecoder {
        pub fn new() -> Self {
            Self
        }

        /// Decode synchronously; `None` when the bytes are not a recognizable image
        pub fn decode_sync(frame: &EncodedFrame) -> Option<RawFrame> {
            let img = match image::load_from_memory(&frame.data) {
                Ok(img) => img,
                Err(e) => {
                    debug!("Frame {} is not a decodable image: {}", frame.id, e);
                    return None;
                }
            };

            let (width, height) = (img.width(), img.height());
            let raw = match img {
                DynamicImage::ImageRgba8(buffer) => RawFrame::new(
                    PixelLayout::Rgba8,
                    AlphaMode::Straight,
                    width,
                    height,
                    buffer.into_raw(),
                ),
                DynamicImage::ImageRgba16(buffer) => RawFrame::new(
                    PixelLayout::Rgba16,
                    AlphaMode::Straight,
                    width,
                    height,
                    buffer
                        .into_raw()
                        .into_iter()
                        .flat_map(|sample| sample.to_ne_bytes())
                        .collect(),
                ),
                opaque @ (DynamicImage::ImageRgb16(_) | DynamicImage::ImageLuma16(_)) => {
                    RawFrame::new(
                        PixelLayout::Rgba16,
                        AlphaMode::Ignore,
                        width,
                        height,
                        opaque
                            .to_rgba16()
                            .into_raw()
                            .into_iter()
                            .flat_map(|sample| sample.to_ne_bytes())
                            .collect(),
                    )
                }
                other => {
                    let alpha_mode = if other.color().has_alpha() {
                        AlphaMode::Straight
                    } else {
                        AlphaMode::Ignore
                    };
                    RawFrame::new(
                        PixelLayout::Rgba8,
                        alpha_mode,
                        width,
                        height,
                        other.to_rgba8().into_raw(),
                    )
                }
            };

            trace!(
                "Decoded frame {} to {:?}/{:?} {}x{}",
                frame.id,
                raw.pixel_layout,
                raw.alpha_mode,
                width,
                height
            );
            Some(raw)
        }
    }

    #[async_trait]
    impl BitmapDecoder for ImageBitmapDecoder {
        async fn decode(&self, frame: EncodedFrame) -> Result<Option<RawFrame>> {
            tokio::task::spawn_blocking(move || Self::decode_sync(&frame))
                .await
                .map_err(|e| {
                    BarcamError::component(
                        "bitmap".to_string(),
                        format!("decode task failed: {}", e),
                    )
                })
        }
    }
}
