//! HTTP camera source.
//!
//! Handles the two transports small IP cameras typically expose:
//! - multipart MJPEG streams (`Content-Type: multipart/...`)
//! - single-JPEG snapshot endpoints (one GET per frame)
//!
//! Frames are decoded in-memory to RGBA8 and decimated to the configured
//! target rate.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::{Duration, Instant};

use image::GenericImageView;
use url::Url;

use super::{frame_interval, CameraConfig, CameraStats};
use crate::frame::Frame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

pub struct MjpegCamera {
    config: CameraConfig,
    transport: Option<Transport>,
    connected_at: Option<Instant>,
    last_frame_at: Option<Instant>,
    frame_count: u64,
    last_error: Option<String>,
}

enum Transport {
    /// Long-lived multipart stream, frames scanned out of the byte stream.
    Stream(JpegScanner),
    /// Snapshot endpoint, fetched once per grab.
    Snapshot,
}

impl MjpegCamera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let url = Url::parse(&config.source).context("parse camera url")?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported camera scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        Ok(Self {
            config,
            transport: None,
            connected_at: None,
            last_frame_at: None,
            frame_count: 0,
            last_error: None,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        let response = ureq::get(&self.config.source)
            .call()
            .context("connect to camera http endpoint")?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.transport = Some(Transport::Stream(JpegScanner::new(reader)));
        } else {
            self.transport = Some(Transport::Snapshot);
        }
        self.connected_at = Some(Instant::now());
        log::info!("MjpegCamera: connected to {}", self.config.source);
        Ok(())
    }

    pub fn grab_frame(&mut self) -> Result<Frame> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| anyhow!("camera not connected; call connect() first"))?;
        let min_interval = frame_interval(self.config.target_fps);
        loop {
            let jpeg_bytes = match transport {
                Transport::Stream(scanner) => scanner.next_jpeg(),
                Transport::Snapshot => fetch_snapshot(&self.config.source),
            }
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })?;

            let now = Instant::now();
            if let Some(last) = self.last_frame_at {
                if now.duration_since(last) < min_interval {
                    continue;
                }
            }

            let frame = decode_jpeg(&jpeg_bytes)?;
            self.frame_count += 1;
            self.last_frame_at = Some(now);
            return Ok(frame);
        }
    }

    pub fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(connected_at) = self.connected_at else {
            return false;
        };
        let Some(last_frame_at) = self.last_frame_at else {
            return connected_at.elapsed() <= Duration::from_secs(5);
        };
        last_frame_at.elapsed() <= health_grace(self.config.target_fps)
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            source: self.config.source.clone(),
        }
    }
}

/// Scans JPEG frames (SOI..EOI) out of a multipart byte stream without
/// parsing the part headers.
struct JpegScanner {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl JpegScanner {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self.reader.read(&mut chunk).context("read mjpeg chunk")?;
            if read == 0 {
                return Err(anyhow!("mjpeg stream ended"));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            // Keep the scan buffer bounded even if no marker ever shows up.
            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let drain_len = self.buffer.len() - 2;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

/// Locate one complete JPEG (SOI 0xFFD8 .. EOI 0xFFD9) in the buffer.
fn jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + 2 + end + 2))
}

fn fetch_snapshot(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("fetch jpeg snapshot from {}", url))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_JPEG_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .context("read jpeg snapshot")?;
    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    if bytes.len() > MAX_JPEG_BYTES {
        return Err(anyhow!("jpeg snapshot exceeds {} bytes", MAX_JPEG_BYTES));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8]) -> Result<Frame> {
    let decoded = image::load_from_memory(bytes).context("decode jpeg frame")?;
    let (width, height) = decoded.dimensions();
    let rgba = decoded.into_rgba8();
    Frame::from_rgba(rgba.into_raw(), width, height)
}

fn health_grace(target_fps: u32) -> Duration {
    let base_ms = if target_fps == 0 {
        2_000
    } else {
        (1000 / target_fps).saturating_mul(6)
    };
    Duration::from_millis(base_ms.max(2_000) as u64)
}
