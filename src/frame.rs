use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Raw channel encoding reported for a decoded bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// 16 bits per channel, RGBA order
    Rgba16,
    /// 8 bits per channel, RGBA order
    Rgba8,
    /// 8 bits per channel, BGRA order
    Bgra8,
    /// Single 16-bit luminance channel
    Gray16,
    /// Single 8-bit luminance channel
    Gray8,
    /// Planar YUV 4:2:0
    Nv12,
    /// Packed YUV 4:2:2
    Yuy2,
    /// Layout the decoder could not name
    Unknown,
}

impl PixelLayout {
    /// Bytes occupied by one channel sample, for the layouts the normalizer accepts
    pub fn bytes_per_channel(&self) -> Option<usize> {
        match self {
            PixelLayout::Rgba16 => Some(2),
            PixelLayout::Rgba8 | PixelLayout::Bgra8 => Some(1),
            _ => None,
        }
    }
}

/// How the alpha channel of a bitmap relates to its color channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    /// Color channels already multiplied by alpha
    Premultiplied,
    /// Alpha is independent of the color channels
    Straight,
    /// Alpha carries no information (opaque source)
    Ignore,
}

/// Canonical format tag handed to the barcode decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Rgb32,
    Rgba32,
    Bgr32,
    Bgra32,
}

impl ColorFormat {
    /// Offsets of the red, green and blue channels inside one 4-channel pixel
    pub fn rgb_offsets(&self) -> (usize, usize, usize) {
        match self {
            ColorFormat::Rgb32 | ColorFormat::Rgba32 => (0, 1, 2),
            ColorFormat::Bgr32 | ColorFormat::Bgra32 => (2, 1, 0),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, ColorFormat::Rgba32 | ColorFormat::Bgra32)
    }
}

/// Rotation options for the live preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    /// Rotate 90 degrees clockwise
    Rotate90,
    /// Rotate 180 degrees
    Rotate180,
    /// Rotate 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl Rotation {
    /// Get rotation angle in degrees
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

/// One frame as handed over by the capture device, still in its encoded form
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Frame sequence number within the device session
    pub id: u64,
    /// Timestamp when frame was grabbed
    pub timestamp: SystemTime,
    /// Encoded bytes (JPEG, PNG, ...)
    pub data: Vec<u8>,
    /// Video width at grab time
    pub width: u32,
    /// Video height at grab time
    pub height: u32,
}

impl EncodedFrame {
    pub fn new(id: u64, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            data,
            width,
            height,
        }
    }
}

/// Decoded bitmap with the layout and alpha mode the bitmap decoder reported
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixel_layout: PixelLayout,
    pub alpha_mode: AlphaMode,
    pub bytes: Vec<u8>,
}

impl RawFrame {
    pub fn new(
        pixel_layout: PixelLayout,
        alpha_mode: AlphaMode,
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            pixel_layout,
            alpha_mode,
            bytes,
        }
    }
}

/// Pixel samples viewed at the bit width of their source layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelBuffer {
    Bits8(Vec<u8>),
    Bits16(Vec<u16>),
}

impl PixelBuffer {
    /// Number of channel samples in the buffer
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::Bits8(samples) => samples.len(),
            PixelBuffer::Bits16(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index`, scaled down to 8 bits
    pub fn sample_u8(&self, index: usize) -> u8 {
        match self {
            PixelBuffer::Bits8(samples) => samples[index],
            PixelBuffer::Bits16(samples) => (samples[index] >> 8) as u8,
        }
    }
}

/// Canonical decoder input
#[derive(Debug, Clone)]
pub struct NormalizedPixels {
    pub pixel_buffer: PixelBuffer,
    pub color_format: ColorFormat,
    pub width: u32,
    pub height: u32,
}

impl NormalizedPixels {
    /// ITU-R BT.601 luma of the pixel at (x, y)
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let base = (y * self.width as usize + x) * 4;
        let (r, g, b) = self.color_format.rgb_offsets();
        let r = self.pixel_buffer.sample_u8(base + r) as u32;
        let g = self.pixel_buffer.sample_u8(base + g) as u32;
        let b = self.pixel_buffer.sample_u8(base + b) as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}
