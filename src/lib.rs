//! framepost: forward camera frames to a detection service and draw the
//! results.
//!
//! The crate runs a small fixed-cadence pipeline: acquire a camera source,
//! grab a frame once per interval, POST its raw RGBA bytes to an HTTP
//! detection endpoint, and redraw a transparent overlay canvas with one
//! rectangle per returned detection. A one-shot photo path grabs the current
//! frame and scales it onto a fixed-size canvas.
//!
//! Module map:
//! - [`frame`]: the transient RGBA bitmap type
//! - [`camera`]: frame sources (synthetic, MJPEG-over-HTTP, V4L2)
//! - [`detect`]: detection service client and wire contract
//! - [`canvas`]: overlay and photo drawing surfaces
//! - [`pipeline`]: the ticker that ties the above together
//! - [`config`]: layered daemon configuration

pub mod camera;
pub mod canvas;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;

pub use camera::{CameraConfig, CameraSession, CameraStats};
pub use canvas::{OverlayCanvas, PhotoCanvas};
pub use config::ForwarderConfig;
pub use detect::{BoundingBox, DetectClient, Detection};
pub use frame::Frame;
pub use pipeline::{FramePipeline, PipelineOptions, PipelineSnapshot};
