//! Drawing surfaces.
//!
//! `OverlayCanvas` carries the detection rectangles for the most recent
//! annotated tick: it is cleared and redrawn as one operation, so boxes
//! never accumulate across ticks. `PhotoCanvas` is the one-shot photo
//! surface: a fixed-size canvas the current frame is scaled onto.

use anyhow::{Context, Result};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

use crate::detect::Detection;
use crate::frame::Frame;

/// Stroke color for detection rectangles.
pub const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Stroke width in pixels.
const BOX_STROKE_PX: u32 = 2;

pub struct OverlayCanvas {
    image: RgbaImage,
}

impl OverlayCanvas {
    /// Create a fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Match the canvas to the frame it annotates. Re-creates (and thereby
    /// clears) the canvas when the size changes.
    pub fn resize_to(&mut self, width: u32, height: u32) {
        if self.image.width() != width || self.image.height() != height {
            self.image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        }
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Clear, then stroke one rectangle per detection. One call per tick;
    /// callers serialize access so a late tick cannot interleave.
    pub fn render(&mut self, detections: &[Detection]) {
        self.clear();
        for detection in detections {
            self.stroke_box(detection);
        }
    }

    fn stroke_box(&mut self, detection: &Detection) {
        let bounds_w = self.image.width() as i64;
        let bounds_h = self.image.height() as i64;
        let pad = BOX_STROKE_PX as i64;

        let x0 = detection.bbox.x.round() as i64;
        let y0 = detection.bbox.y.round() as i64;
        let x1 = x0.saturating_add((detection.bbox.w.round() as i64).max(1));
        let y1 = y0.saturating_add((detection.bbox.h.round() as i64).max(1));

        if x1 <= 0 || y1 <= 0 || x0 >= bounds_w || y0 >= bounds_h {
            return;
        }

        // Clamp to just outside the canvas: off-canvas edges land at
        // coordinates the rasterizer clips away, and on-canvas pixels are
        // unaffected. Unclamped coordinates can overflow inside the line
        // rasterizer.
        let x0 = x0.max(-pad) as i32;
        let y0 = y0.max(-pad) as i32;
        let w = (x1.min(bounds_w + pad) - x0 as i64) as u32;
        let h = (y1.min(bounds_h + pad) - y0 as i64) as u32;

        for inset in 0..BOX_STROKE_PX {
            let iw = w.saturating_sub(inset * 2);
            let ih = h.saturating_sub(inset * 2);
            if iw == 0 || ih == 0 {
                break;
            }
            let rect = Rect::at(x0 + inset as i32, y0 + inset as i32).of_size(iw, ih);
            draw_hollow_rect_mut(&mut self.image, rect, BOX_COLOR);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn write_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("write overlay png {}", path.display()))
    }
}

/// Fixed-size photo surface for the one-shot capture.
pub struct PhotoCanvas {
    image: RgbaImage,
}

impl PhotoCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Draw the frame at (0,0) scaled to the canvas dimensions, replacing
    /// any previous contents.
    pub fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        let source = RgbaImage::from_raw(frame.width, frame.height, frame.rgba().to_vec())
            .context("frame buffer does not match its dimensions")?;
        if source.width() == self.image.width() && source.height() == self.image.height() {
            self.image = source;
        } else {
            self.image = imageops::resize(
                &source,
                self.image.width(),
                self.image.height(),
                imageops::FilterType::Triangle,
            );
        }
        Ok(())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn write_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("write photo png {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn detection(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection {
            label: "person".to_string(),
            bbox: BoundingBox { x, y, w, h },
            score: 0.9,
        }
    }

    const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn render_strokes_box_borders_and_leaves_interior() {
        let mut canvas = OverlayCanvas::new(64, 48);
        canvas.render(&[detection(10.0, 10.0, 20.0, 12.0)]);

        // 2px stroke: outer border and the row inside it.
        assert_eq!(canvas.pixel(10, 10), BOX_COLOR);
        assert_eq!(canvas.pixel(11, 11), BOX_COLOR);
        // Interior stays transparent.
        assert_eq!(canvas.pixel(20, 16), TRANSPARENT);
        // Outside the box too.
        assert_eq!(canvas.pixel(5, 5), TRANSPARENT);
    }

    #[test]
    fn render_clears_previous_boxes() {
        let mut canvas = OverlayCanvas::new(64, 48);
        canvas.render(&[detection(10.0, 10.0, 20.0, 12.0), detection(40.0, 30.0, 15.0, 10.0)]);
        assert_eq!(canvas.pixel(40, 30), BOX_COLOR);

        canvas.render(&[detection(10.0, 10.0, 20.0, 12.0)]);
        assert_eq!(canvas.pixel(10, 10), BOX_COLOR);
        // The second box must not survive the redraw.
        assert_eq!(canvas.pixel(40, 30), TRANSPARENT);
    }

    #[test]
    fn render_with_no_detections_clears_everything() {
        let mut canvas = OverlayCanvas::new(32, 32);
        canvas.render(&[detection(2.0, 2.0, 10.0, 10.0)]);
        canvas.render(&[]);
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(canvas.pixel(x, y), TRANSPARENT);
            }
        }
    }

    #[test]
    fn out_of_bounds_box_does_not_panic() {
        let mut canvas = OverlayCanvas::new(32, 32);
        canvas.render(&[detection(28.0, 28.0, 50.0, 50.0)]);
        canvas.render(&[detection(-5.0, -5.0, 10.0, 10.0)]);
    }

    #[test]
    fn extreme_coordinates_are_clamped_not_panicking() {
        let mut canvas = OverlayCanvas::new(32, 32);

        // Entirely off-canvas: skipped.
        canvas.render(&[detection(4.0e18, 4.0e18, 9.0e18, 9.0e18)]);
        // Engulfs the canvas: every edge lies outside, so nothing shows.
        canvas.render(&[detection(-4.0e18, -4.0e18, 9.0e18, 9.0e18)]);
        for y in 0..32 {
            for x in 0..32 {
                assert_eq!(canvas.pixel(x, y), TRANSPARENT);
            }
        }

        // Horizontally unbounded but vertically on-canvas: the top edge
        // still strokes across the full width.
        canvas.render(&[detection(-1.0e18, 10.0, 2.0e18, 8.0)]);
        assert_eq!(canvas.pixel(16, 10), BOX_COLOR);
        assert_eq!(canvas.pixel(16, 11), BOX_COLOR);
        assert_eq!(canvas.pixel(16, 14), TRANSPARENT);
    }

    #[test]
    fn resize_clears_on_dimension_change() {
        let mut canvas = OverlayCanvas::new(32, 32);
        canvas.render(&[detection(2.0, 2.0, 10.0, 10.0)]);
        canvas.resize_to(64, 48);
        assert_eq!(canvas.width(), 64);
        assert_eq!(canvas.height(), 48);
        assert_eq!(canvas.pixel(2, 2), TRANSPARENT);
    }

    #[test]
    fn photo_draw_same_size_copies_exactly() {
        let mut pixels = vec![0u8; 4 * 3 * 4];
        for (i, byte) in pixels.iter_mut().enumerate() {
            *byte = (i % 256) as u8;
        }
        let frame = Frame::from_rgba(pixels.clone(), 4, 3).unwrap();

        let mut canvas = PhotoCanvas::new(4, 3);
        canvas.draw_frame(&frame).unwrap();
        assert_eq!(canvas.image().as_raw(), &pixels);
    }

    #[test]
    fn photo_draw_scales_to_canvas_size() {
        let frame = Frame::from_rgba(vec![128u8; 8 * 6 * 4], 8, 6).unwrap();
        let mut canvas = PhotoCanvas::new(4, 3);
        canvas.draw_frame(&frame).unwrap();
        assert_eq!(canvas.width(), 4);
        assert_eq!(canvas.height(), 3);
        // Uniform input stays uniform through the resampler.
        assert_eq!(canvas.image().get_pixel(2, 1), &Rgba([128, 128, 128, 128]));
    }

    #[test]
    fn write_png_produces_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");

        let mut canvas = OverlayCanvas::new(16, 16);
        canvas.render(&[detection(2.0, 2.0, 8.0, 8.0)]);
        canvas.write_png(&path).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0);
    }
}
