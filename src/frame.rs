//! Transient frame type.
//!
//! A `Frame` is a single bitmap sampled from a camera at one instant. Frames
//! exist only for the duration of one capture-forward-draw cycle; nothing in
//! this crate persists them.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

/// Bytes per pixel of the wire format (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// One captured bitmap, RGBA8, row-major.
pub struct Frame {
    pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    captured_at: Instant,
}

impl Frame {
    /// Build a frame from an RGBA8 buffer, validating the length against the
    /// dimensions.
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGBA frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
            captured_at: Instant::now(),
        })
    }

    /// Flattened RGBA bytes, length = width * height * 4. This is exactly the
    /// byte sequence forwarded to the detection service.
    pub fn rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// Time since this frame was captured.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_validates_length() {
        let frame = Frame::from_rgba(vec![0u8; 2 * 3 * 4], 2, 3).unwrap();
        assert_eq!(frame.width, 2);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.rgba().len(), 24);

        assert!(Frame::from_rgba(vec![0u8; 23], 2, 3).is_err());
    }
}
