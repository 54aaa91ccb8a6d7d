//! Capture-forward-draw pipeline.
//!
//! `FramePipeline` ties a camera session, the detection client, and the
//! overlay canvas together. After `start()` acquires the camera,
//! `spawn_loop()` runs a ticker thread that fires on a fixed wall-clock
//! interval. Each tick grabs a frame, forwards it to the detection service,
//! and redraws the overlay from the response. A tick that fails logs and is
//! dropped; the ticker itself never stops on tick errors.
//!
//! By default ticks overlap: the ticker detaches one worker thread per tick
//! and keeps its cadence regardless of how long the service takes, so a slow
//! service sees a backlog of in-flight requests rather than a slower client.
//! `single_flight` trades that for at-most-one in-flight request: the tick
//! runs inline in the ticker, which keeps its start-to-start cadence while
//! ticks finish within the interval and slips only when one overruns it.

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::camera::{CameraConfig, CameraSession, CameraStats};
use crate::canvas::{OverlayCanvas, PhotoCanvas};
use crate::detect::DetectClient;

/// How finely the ticker slices its sleep so `stop()` is not kept waiting
/// for a full interval.
const SHUTDOWN_POLL: Duration = Duration::from_millis(25);

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Wall-clock spacing between detection ticks.
    pub interval: Duration,
    /// Run ticks inline, at most one request in flight.
    pub single_flight: bool,
    /// One-shot photo dimensions.
    pub photo_width: u32,
    pub photo_height: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            single_flight: false,
            photo_width: 640,
            photo_height: 480,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Running,
    Stopped,
}

/// Counters published by the ticker and its workers.
#[derive(Default)]
pub struct PipelineStats {
    ticks: AtomicU64,
    failures: AtomicU64,
    annotated: AtomicU64,
    last_detections: AtomicU64,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Clone, Copy, Debug)]
pub struct PipelineSnapshot {
    /// Ticks fired by the scheduler.
    pub ticks: u64,
    /// Ticks that failed at any stage (capture, transport, parse).
    pub failures: u64,
    /// Ticks that redrew the overlay.
    pub annotated: u64,
    /// Detection count from the most recent annotated tick.
    pub last_detections: u64,
}

impl PipelineStats {
    fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            annotated: self.annotated.load(Ordering::Relaxed),
            last_detections: self.last_detections.load(Ordering::Relaxed),
        }
    }
}

pub struct FramePipeline {
    camera_config: CameraConfig,
    client: Arc<DetectClient>,
    overlay: Arc<Mutex<OverlayCanvas>>,
    options: PipelineOptions,
    stats: Arc<PipelineStats>,
    camera: Arc<Mutex<Option<CameraSession>>>,
    shutdown: Arc<AtomicBool>,
    ticker: Option<thread::JoinHandle<()>>,
    state: State,
}

impl FramePipeline {
    pub fn new(
        camera_config: CameraConfig,
        client: DetectClient,
        options: PipelineOptions,
    ) -> Self {
        let overlay = OverlayCanvas::new(camera_config.width, camera_config.height);
        Self {
            camera_config,
            client: Arc::new(client),
            overlay: Arc::new(Mutex::new(overlay)),
            options,
            stats: Arc::new(PipelineStats::default()),
            camera: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(false)),
            ticker: None,
            state: State::Idle,
        }
    }

    /// Acquire the camera. Failure is terminal: the pipeline stays idle and
    /// no loop may be spawned.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Running => return Err(anyhow!("pipeline already started")),
            State::Stopped => return Err(anyhow!("pipeline is stopped; build a new one")),
        }
        let session = CameraSession::open(self.camera_config.clone())
            .context("acquire camera for pipeline")?;
        *lock_ignore_poison(&self.camera) = Some(session);
        self.state = State::Running;
        Ok(())
    }

    /// Spawn the detection ticker. Requires a started pipeline; at most one
    /// loop per pipeline.
    pub fn spawn_loop(&mut self) -> Result<()> {
        if self.state != State::Running {
            return Err(anyhow!("pipeline not started"));
        }
        if self.ticker.is_some() {
            return Err(anyhow!("detection loop already running"));
        }

        let camera = Arc::clone(&self.camera);
        let client = Arc::clone(&self.client);
        let overlay = Arc::clone(&self.overlay);
        let stats = Arc::clone(&self.stats);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.options.interval;
        let single_flight = self.options.single_flight;

        let handle = thread::Builder::new()
            .name("framepost-ticker".to_string())
            .spawn(move || {
                log::info!(
                    "detection loop started (interval {:?}, single_flight {})",
                    interval,
                    single_flight
                );
                while !shutdown.load(Ordering::Relaxed) {
                    let started = Instant::now();
                    stats.ticks.fetch_add(1, Ordering::Relaxed);

                    if single_flight {
                        run_tick(&camera, &client, &overlay, &stats);
                    } else {
                        let worker_camera = Arc::clone(&camera);
                        let worker_client = Arc::clone(&client);
                        let worker_overlay = Arc::clone(&overlay);
                        let worker_stats = Arc::clone(&stats);
                        // Detached worker: a slow service delays this tick's
                        // result, never the next tick.
                        let spawned = thread::Builder::new()
                            .name("framepost-tick".to_string())
                            .spawn(move || {
                                run_tick(&worker_camera, &worker_client, &worker_overlay, &worker_stats)
                            });
                        if let Err(err) = spawned {
                            stats.failures.fetch_add(1, Ordering::Relaxed);
                            log::warn!("tick worker spawn failed: {err}");
                        }
                    }

                    let mut remaining = interval.saturating_sub(started.elapsed());
                    while remaining > Duration::ZERO && !shutdown.load(Ordering::Relaxed) {
                        let slice = remaining.min(SHUTDOWN_POLL);
                        thread::sleep(slice);
                        remaining = remaining.saturating_sub(slice);
                    }
                }
                log::info!("detection loop stopped");
            })
            .context("spawn detection ticker")?;
        self.ticker = Some(handle);
        Ok(())
    }

    /// Take a one-shot photo: grab the current frame and draw it scaled onto
    /// a fresh canvas. Independent of the detection loop.
    pub fn capture_photo(&self) -> Result<PhotoCanvas> {
        if self.state != State::Running {
            return Err(anyhow!("pipeline not started"));
        }
        let mut guard = lock_ignore_poison(&self.camera);
        let session = guard.as_mut().ok_or_else(|| anyhow!("camera released"))?;
        let frame = session.grab_frame().context("grab frame for photo")?;
        drop(guard);

        let mut canvas = PhotoCanvas::new(self.options.photo_width, self.options.photo_height);
        canvas.draw_frame(&frame)?;
        Ok(canvas)
    }

    /// Stop the ticker and release the camera. In-flight tick workers finish
    /// on their own; once the camera is gone they skip their capture.
    pub fn stop(&mut self) {
        if self.state != State::Running {
            return;
        }
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.ticker.take() {
            if handle.join().is_err() {
                log::warn!("detection ticker panicked");
            }
        }
        if let Some(session) = lock_ignore_poison(&self.camera).take() {
            session.release();
        }
        self.state = State::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn stats(&self) -> PipelineSnapshot {
        self.stats.snapshot()
    }

    pub fn camera_healthy(&self) -> bool {
        lock_ignore_poison(&self.camera)
            .as_ref()
            .map(CameraSession::is_healthy)
            .unwrap_or(false)
    }

    pub fn camera_stats(&self) -> Option<CameraStats> {
        lock_ignore_poison(&self.camera)
            .as_ref()
            .map(CameraSession::stats)
    }

    /// Shared handle to the overlay canvas (e.g. for writing it to disk).
    pub fn overlay(&self) -> Arc<Mutex<OverlayCanvas>> {
        Arc::clone(&self.overlay)
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One detection tick: capture under the camera lock, forward outside it,
/// then clear-and-redraw the overlay. Errors are logged and swallowed.
fn run_tick(
    camera: &Mutex<Option<CameraSession>>,
    client: &DetectClient,
    overlay: &Mutex<OverlayCanvas>,
    stats: &PipelineStats,
) {
    let frame = {
        let mut guard = lock_ignore_poison(camera);
        let Some(session) = guard.as_mut() else {
            // Camera released while this tick was queued.
            return;
        };
        match session.grab_frame() {
            Ok(frame) => frame,
            Err(err) => {
                stats.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("tick dropped: {err:#}");
                return;
            }
        }
    };

    match client.detect(&frame) {
        Ok(detections) => {
            let mut canvas = lock_ignore_poison(overlay);
            canvas.resize_to(frame.width, frame.height);
            canvas.render(&detections);
            stats.annotated.fetch_add(1, Ordering::Relaxed);
            stats
                .last_detections
                .store(detections.len() as u64, Ordering::Relaxed);
            log::debug!(
                "annotated {} detection(s), frame age {:?}",
                detections.len(),
                frame.age()
            );
        }
        Err(err) => {
            stats.failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("tick dropped: {err:#}");
        }
    }
}

/// A poisoned lock here means a tick worker panicked mid-draw; the data is
/// pixels and counters, safe to keep using.
fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_pipeline() -> FramePipeline {
        FramePipeline::new(
            CameraConfig {
                source: "stub://webcam".to_string(),
                target_fps: 0,
                width: 32,
                height: 24,
            },
            DetectClient::new("http://127.0.0.1:9/detect", Duration::from_millis(100)),
            PipelineOptions {
                interval: Duration::from_millis(50),
                single_flight: false,
                photo_width: 16,
                photo_height: 12,
            },
        )
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut pipeline = stub_pipeline();
        pipeline.start().unwrap();
        assert!(pipeline.start().is_err());
        pipeline.stop();
        assert!(!pipeline.is_running());
    }

    #[test]
    fn spawn_loop_requires_start() {
        let mut pipeline = stub_pipeline();
        assert!(pipeline.spawn_loop().is_err());
    }

    #[test]
    fn stopped_pipeline_rejects_restart() {
        let mut pipeline = stub_pipeline();
        pipeline.start().unwrap();
        pipeline.stop();
        assert!(pipeline.start().is_err());
        assert!(pipeline.capture_photo().is_err());
    }

    #[test]
    fn capture_photo_uses_configured_dimensions() {
        let mut pipeline = stub_pipeline();
        pipeline.start().unwrap();
        let photo = pipeline.capture_photo().unwrap();
        assert_eq!(photo.width(), 16);
        assert_eq!(photo.height(), 12);
        pipeline.stop();
    }
}
