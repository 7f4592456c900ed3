use crate::error::{FrameError, Result};
use crate::frame::{AlphaMode, ColorFormat, NormalizedPixels, PixelBuffer, PixelLayout, RawFrame};
use tracing::{debug, trace};

/// Converts decoded bitmaps into the canonical buffer + format pair the barcode decoder reads
pub struct PixelNormalizer;

impl PixelNormalizer {
    /// Normalize a decoded frame, taking ownership of its bytes
    pub fn normalize_frame(frame: RawFrame) -> Result<NormalizedPixels> {
        Self::normalize(
            frame.pixel_layout,
            frame.alpha_mode,
            frame.width,
            frame.height,
            frame.bytes,
        )
    }

    /// Map a reported layout and alpha mode onto a decoder color format.
    ///
    /// Only straight alpha keeps an alpha-carrying format; premultiplied and
    /// opaque frames go to the variant without independent alpha.
    pub fn normalize(
        layout: PixelLayout,
        alpha_mode: AlphaMode,
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    ) -> Result<NormalizedPixels> {
        let straight = alpha_mode == AlphaMode::Straight;

        let (color_format, bytes_per_channel) = match layout {
            PixelLayout::Rgba16 => {
                debug!("RGBA16 detected");
                (Self::rgba_format(straight), 2)
            }
            PixelLayout::Rgba8 => {
                debug!("RGBA8 detected");
                (Self::rgba_format(straight), 1)
            }
            PixelLayout::Bgra8 => {
                debug!("BGRA8 detected");
                let format = if straight {
                    ColorFormat::Bgra32
                } else {
                    ColorFormat::Bgr32
                };
                (format, 1)
            }
            other => {
                return Err(FrameError::UnsupportedPixelLayout { layout: other }.into());
            }
        };

        // Dimensions too large to address count as a size mismatch
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4 * bytes_per_channel))
            .unwrap_or(usize::MAX);
        if bytes.len() != expected {
            return Err(FrameError::PixelBufferSize {
                expected,
                actual: bytes.len(),
            }
            .into());
        }

        let pixel_buffer = if bytes_per_channel == 2 {
            PixelBuffer::Bits16(
                bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                    .collect(),
            )
        } else {
            PixelBuffer::Bits8(bytes)
        };

        trace!(
            "Normalized {}x{} {:?}/{:?} frame to {:?} ({} samples)",
            width,
            height,
            layout,
            alpha_mode,
            color_format,
            pixel_buffer.len()
        );

        Ok(NormalizedPixels {
            pixel_buffer,
            color_format,
            width,
            height,
        })
    }

    fn rgba_format(straight: bool) -> ColorFormat {
        if straight {
            ColorFormat::Rgba32
        } else {
            ColorFormat::Rgb32
        }
    }
}
