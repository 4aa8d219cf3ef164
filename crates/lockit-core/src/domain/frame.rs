//! Pixel buffers handed from the frame sampler to the QR decoder.
//!
//! A [`Frame`] is a tightly packed RGBA8 image: 4 bytes per pixel, rows
//! top-to-bottom, no padding between rows.  This is the layout produced by a
//! canvas `getImageData` call and by most camera pipelines after colour
//! conversion, so sources can copy straight into it.
//!
//! The sampler keeps one `Frame` for the whole scanning session and calls
//! [`Frame::resize`] before every copy, so the buffer always matches the
//! stream's native resolution but is only reallocated when that resolution
//! grows.

use thiserror::Error;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Error returned when raw pixel data does not match the declared size.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
pub struct FrameSizeError {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// An RGBA8 pixel buffer with its dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Creates an empty 0x0 frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing RGBA8 data.
    ///
    /// # Errors
    ///
    /// Returns [`FrameSizeError`] if `pixels.len() != width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameSizeError> {
        let expected = byte_len(width, height);
        if pixels.len() != expected {
            return Err(FrameSizeError {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Resizes the buffer to `width` x `height`, zero-filling new bytes.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize(byte_len(width, height), 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `true` when the frame holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Returns the ITU-R BT.601 luma of the pixel at (`x`, `y`).
    ///
    /// Alpha is ignored.  Panics if the coordinates are out of bounds.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let i = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let (r, g, b) = (
            u32::from(self.pixels[i]),
            u32::from(self.pixels[i + 1]),
            u32::from(self.pixels[i + 2]),
        );
        // Fixed-point 0.299 R + 0.587 G + 0.114 B.
        ((r * 77 + g * 150 + b * 29) >> 8) as u8
    }
}

/// A successful decode: the raw text carried by the QR symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub text: String,
}

impl ScanResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}
