//! snapshot - one-shot photo capture
//!
//! Opens the camera source, grabs a single frame, scales it onto a
//! fixed-size canvas, and writes it as PNG. No detection involved.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use framepost::{CameraConfig, CameraSession, PhotoCanvas};

#[derive(Parser, Debug)]
#[command(name = "snapshot", about = "Capture one photo from a camera source")]
struct Args {
    /// Camera source (stub://, http(s)://, or a device path)
    #[arg(long, env = "FRAMEPOST_CAMERA_SOURCE", default_value = "stub://webcam")]
    camera: String,

    /// Photo width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Photo height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Output path
    #[arg(long, default_value = "snapshot.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut session = CameraSession::open(CameraConfig {
        source: args.camera,
        target_fps: 0,
        width: args.width,
        height: args.height,
    })?;
    let frame = session.grab_frame()?;
    session.release();

    let mut canvas = PhotoCanvas::new(args.width, args.height);
    canvas.draw_frame(&frame)?;
    canvas.write_png(&args.output)?;

    log::info!(
        "wrote {}x{} photo to {}",
        canvas.width(),
        canvas.height(),
        args.output.display()
    );
    Ok(())
}
