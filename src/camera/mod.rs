//! Camera frame sources.
//!
//! A `CameraSession` wraps one active source, selected by the scheme of the
//! configured `source` string:
//! - `stub://...`   synthetic pattern generator (tests, demos)
//! - `http(s)://..` MJPEG multipart stream or single-JPEG snapshot endpoint
//! - anything else  local V4L2 device path (feature: camera-v4l2)
//!
//! Sources capture in-memory only and decimate to the configured target
//! frame rate where the transport pushes frames faster. Acquisition failures
//! are terminal: `CameraSession::open` returns an error and no session
//! exists. A session holds its device until `release()` is called.

#[cfg(feature = "camera-v4l2")]
pub(crate) mod convert;
pub mod mjpeg;
pub mod synthetic;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use mjpeg::MjpegCamera;
use synthetic::SyntheticCamera;
#[cfg(feature = "camera-v4l2")]
use v4l2::V4l2Camera;

/// Configuration for a camera session.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source string. `stub://`, `http(s)://`, or a device path.
    pub source: String,
    /// Target frame rate (frames per second). 0 disables decimation.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "stub://webcam".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Statistics for a camera session.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub source: String,
}

/// An active camera session.
pub struct CameraSession {
    backend: CameraBackend,
    source: String,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    Mjpeg(MjpegCamera),
    #[cfg(feature = "camera-v4l2")]
    V4l2(V4l2Camera),
}

impl CameraSession {
    /// Acquire the configured source and begin streaming.
    ///
    /// Failure here is terminal for the session: the caller gets an error
    /// and no capture loop should start.
    pub fn open(config: CameraConfig) -> Result<Self> {
        let source = config.source.clone();
        let backend = if config.source.starts_with("stub://") {
            let mut camera = SyntheticCamera::new(config);
            camera.connect()?;
            CameraBackend::Synthetic(camera)
        } else if config.source.starts_with("http://") || config.source.starts_with("https://") {
            let mut camera = MjpegCamera::new(config)?;
            camera.connect()?;
            CameraBackend::Mjpeg(camera)
        } else {
            #[cfg(feature = "camera-v4l2")]
            {
                let mut camera = V4l2Camera::new(config)?;
                camera.connect()?;
                CameraBackend::V4l2(camera)
            }
            #[cfg(not(feature = "camera-v4l2"))]
            {
                return Err(anyhow!(
                    "device capture requires the camera-v4l2 feature (source: {})",
                    config.source
                ));
            }
        };
        log::info!("camera session started: {}", source);
        Ok(Self { backend, source })
    }

    /// Grab the next frame from the source.
    pub fn grab_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.grab_frame(),
            CameraBackend::Mjpeg(camera) => camera.grab_frame(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::V4l2(camera) => camera.grab_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.is_healthy(),
            CameraBackend::Mjpeg(camera) => camera.is_healthy(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::V4l2(camera) => camera.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            CameraBackend::Mjpeg(camera) => camera.stats(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::V4l2(camera) => camera.stats(),
        }
    }

    /// Stop streaming and free the underlying device or connection.
    pub fn release(self) {
        log::info!("camera session released: {}", self.source);
        drop(self.backend);
    }
}

/// Minimum spacing between frames for a target rate. Zero disables
/// decimation.
pub(crate) fn frame_interval(target_fps: u32) -> std::time::Duration {
    if target_fps == 0 {
        std::time::Duration::from_millis(0)
    } else {
        std::time::Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_scheme_opens_synthetic_source() {
        let session = CameraSession::open(CameraConfig {
            source: "stub://webcam".to_string(),
            target_fps: 0,
            width: 32,
            height: 24,
        });
        let mut session = session.unwrap();
        let frame = session.grab_frame().unwrap();
        assert_eq!(frame.width, 32);
        assert_eq!(frame.height, 24);
        assert!(session.is_healthy());
        session.release();
    }

    #[cfg(not(feature = "camera-v4l2"))]
    #[test]
    fn device_path_requires_v4l2_feature() {
        let err = CameraSession::open(CameraConfig {
            source: "/dev/video0".to_string(),
            ..CameraConfig::default()
        })
        .err()
        .expect("device path must be rejected without the feature");
        assert!(err.to_string().contains("camera-v4l2"));
    }

    #[test]
    fn unreachable_http_source_fails_to_open() {
        // Nothing listens on port 9; acquisition errors are terminal.
        let result = CameraSession::open(CameraConfig {
            source: "http://127.0.0.1:9/stream".to_string(),
            ..CameraConfig::default()
        });
        assert!(result.is_err());
    }
}
