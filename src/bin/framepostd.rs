//! framepostd - frame forwarding daemon
//!
//! This daemon:
//! 1. Acquires the configured camera source
//! 2. Fires a detection tick every interval: grab frame, POST raw RGBA
//!    bytes to the detection service, redraw the overlay from the response
//! 3. Writes the overlay PNG after annotated ticks (when a path is set)
//! 4. Logs pipeline and camera health periodically
//!
//! Configuration comes from FRAMEPOST_CONFIG (JSON), FRAMEPOST_* environment
//! overrides, and the flags below, in that order of precedence.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use framepost::{DetectClient, ForwarderConfig, FramePipeline, PipelineOptions};

#[derive(Parser, Debug)]
#[command(name = "framepostd", about = "Forward camera frames to a detection service")]
struct Args {
    /// Camera source (stub://, http(s)://, or a device path)
    #[arg(long)]
    camera: Option<String>,

    /// Detection service endpoint
    #[arg(long)]
    detect_url: Option<String>,

    /// Milliseconds between detection ticks
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Write the overlay PNG here after annotated ticks
    #[arg(long)]
    overlay_path: Option<PathBuf>,

    /// Allow at most one detection request in flight
    #[arg(long)]
    single_flight: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ForwarderConfig::load()?;
    if let Some(camera) = args.camera {
        config.camera.source = camera;
    }
    if let Some(url) = args.detect_url {
        config.detect.url = url;
    }
    if let Some(ms) = args.interval_ms {
        config.detect.interval = Duration::from_millis(ms);
    }
    if let Some(path) = args.overlay_path {
        config.overlay_path = Some(path);
    }
    if args.single_flight {
        config.detect.single_flight = true;
    }
    config.validate()?;

    let client = DetectClient::new(config.detect.url.clone(), config.detect.request_timeout);
    let options = PipelineOptions {
        interval: config.detect.interval,
        single_flight: config.detect.single_flight,
        photo_width: config.photo.width,
        photo_height: config.photo.height,
    };
    let mut pipeline = FramePipeline::new(config.camera.clone(), client, options);
    pipeline.start()?;
    pipeline.spawn_loop()?;

    log::info!(
        "framepostd running: camera={} detect={} interval={:?}",
        config.camera.source,
        config.detect.url,
        config.detect.interval
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install signal handler")?;
    }

    let overlay = pipeline.overlay();
    let mut last_health_log = Instant::now();
    let mut last_annotated = 0u64;

    while running.load(Ordering::SeqCst) {
        let stats = pipeline.stats();

        if let Some(path) = &config.overlay_path {
            if stats.annotated != last_annotated {
                last_annotated = stats.annotated;
                let canvas = overlay
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Err(err) = canvas.write_png(path) {
                    log::warn!("overlay write failed: {err:#}");
                }
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let frames = pipeline
                .camera_stats()
                .map(|s| s.frames_captured)
                .unwrap_or(0);
            log::info!(
                "camera health={} frames={} ticks={} annotated={} failures={} last_detections={}",
                pipeline.camera_healthy(),
                frames,
                stats.ticks,
                stats.annotated,
                stats.failures,
                stats.last_detections
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(100));
    }

    log::info!("shutting down");
    pipeline.stop();
    Ok(())
}
