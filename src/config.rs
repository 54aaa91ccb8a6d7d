//! Forwarder configuration.
//!
//! Layered the usual way: compiled defaults, then an optional JSON file
//! named by `FRAMEPOST_CONFIG`, then individual environment overrides.
//! `validate()` runs after layering and rejects values the pipeline cannot
//! run with.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::CameraConfig;

pub const DEFAULT_CAMERA_SOURCE: &str = "stub://webcam";
pub const DEFAULT_TARGET_FPS: u32 = 10;
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;
pub const DEFAULT_DETECT_URL: &str = "http://127.0.0.1:5000/detect";
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PHOTO_WIDTH: u32 = 640;
pub const DEFAULT_PHOTO_HEIGHT: u32 = 480;

/// Detection service settings.
#[derive(Clone, Debug)]
pub struct DetectSettings {
    pub url: String,
    /// Wall-clock spacing between detection ticks.
    pub interval: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// At most one request in flight (default: overlapping ticks).
    pub single_flight: bool,
}

/// One-shot photo settings.
#[derive(Clone, Debug)]
pub struct PhotoSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug)]
pub struct ForwarderConfig {
    pub camera: CameraConfig,
    pub detect: DetectSettings,
    pub photo: PhotoSettings,
    /// Where the daemon writes the overlay PNG after annotated ticks.
    pub overlay_path: Option<PathBuf>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: DEFAULT_CAMERA_SOURCE.to_string(),
                target_fps: DEFAULT_TARGET_FPS,
                width: DEFAULT_FRAME_WIDTH,
                height: DEFAULT_FRAME_HEIGHT,
            },
            detect: DetectSettings {
                url: DEFAULT_DETECT_URL.to_string(),
                interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
                request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
                single_flight: false,
            },
            photo: PhotoSettings {
                width: DEFAULT_PHOTO_WIDTH,
                height: DEFAULT_PHOTO_HEIGHT,
            },
            overlay_path: None,
        }
    }
}

// File-shape structs: everything optional so a partial file works.

#[derive(Deserialize, Default)]
struct ForwarderConfigFile {
    camera: Option<CameraFile>,
    detect: Option<DetectFile>,
    photo: Option<PhotoFile>,
    overlay_path: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct CameraFile {
    source: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize, Default)]
struct DetectFile {
    url: Option<String>,
    interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    single_flight: Option<bool>,
}

#[derive(Deserialize, Default)]
struct PhotoFile {
    width: Option<u32>,
    height: Option<u32>,
}

impl ForwarderConfig {
    /// Defaults, then the file named by `FRAMEPOST_CONFIG` (if set), then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("FRAMEPOST_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let file: ForwarderConfigFile = serde_json::from_str(&text)
            .with_context(|| format!("parse config file {}", path.display()))?;

        let mut config = Self::default();
        if let Some(camera) = file.camera {
            if let Some(source) = camera.source {
                config.camera.source = source;
            }
            if let Some(fps) = camera.target_fps {
                config.camera.target_fps = fps;
            }
            if let Some(width) = camera.width {
                config.camera.width = width;
            }
            if let Some(height) = camera.height {
                config.camera.height = height;
            }
        }
        if let Some(detect) = file.detect {
            if let Some(url) = detect.url {
                config.detect.url = url;
            }
            if let Some(ms) = detect.interval_ms {
                config.detect.interval = Duration::from_millis(ms);
            }
            if let Some(ms) = detect.request_timeout_ms {
                config.detect.request_timeout = Duration::from_millis(ms);
            }
            if let Some(single_flight) = detect.single_flight {
                config.detect.single_flight = single_flight;
            }
        }
        if let Some(photo) = file.photo {
            if let Some(width) = photo.width {
                config.photo.width = width;
            }
            if let Some(height) = photo.height {
                config.photo.height = height;
            }
        }
        if let Some(path) = file.overlay_path {
            config.overlay_path = Some(path);
        }
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("FRAMEPOST_CAMERA_SOURCE") {
            self.camera.source = source;
        }
        if let Ok(url) = std::env::var("FRAMEPOST_DETECT_URL") {
            self.detect.url = url;
        }
        if let Ok(ms) = std::env::var("FRAMEPOST_INTERVAL_MS") {
            let ms: u64 = ms
                .parse()
                .context("FRAMEPOST_INTERVAL_MS must be an integer number of milliseconds")?;
            self.detect.interval = Duration::from_millis(ms);
        }
        if let Ok(path) = std::env::var("FRAMEPOST_OVERLAY_PATH") {
            self.overlay_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.detect.interval.is_zero() {
            return Err(anyhow!("detect.interval_ms must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be greater than zero"));
        }
        if self.photo.width == 0 || self.photo.height == 0 {
            return Err(anyhow!("photo dimensions must be greater than zero"));
        }
        let url = url::Url::parse(&self.detect.url)
            .with_context(|| format!("invalid detect url: {}", self.detect.url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(anyhow!(
                "detect url must be http or https: {}",
                self.detect.url
            ));
        }
        if self.camera.source.is_empty() {
            return Err(anyhow!("camera.source must not be empty"));
        }
        Ok(())
    }
}
