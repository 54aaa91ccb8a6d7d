//! Synthetic frame source for `stub://` sources.
//!
//! Generates a deterministic moving pattern so tests and demos can run
//! without a device or network. The pattern shifts with the frame counter,
//! which is enough to make consecutive frames distinguishable.

use anyhow::Result;

use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

pub struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    /// Synthetic sources are always "connected".
    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticCamera: connected to {} ({}x{})",
            self.config.source,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub fn grab_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let pixels = self.pattern_pixels();
        Frame::from_rgba(pixels, self.config.width, self.config.height)
    }

    /// Fill the buffer with a pattern that drifts one pixel per frame.
    fn pattern_pixels(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let mut pixels = vec![0u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let base = ((x + y + self.frame_count as usize) % 256) as u8;
                let offset = (y * width + x) * 4;
                pixels[offset] = base;
                pixels[offset + 1] = 255 - base;
                pixels[offset + 2] = ((x ^ y) % 256) as u8;
                pixels[offset + 3] = 0xFF;
            }
        }
        pixels
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            source: self.config.source.clone(),
        }
    }
}
