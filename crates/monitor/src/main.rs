//! Drowsiness Monitor - Main Entry Point

use std::path::PathBuf;

use camera_capture::CaptureTask;
use clap::Parser;
use display::BitmapConverter;
use dms::DmsModule;
use monitor::{
    build_detector, build_sinks, build_source, init_logging, Pipeline, Settings, SourceKind,
};
use tracing::{error, info, warn};

/// Webcam drowsiness monitor
///
/// Eye detection (and the webcam source) needs a build with the `opencv`
/// feature: `cargo build --release --features opencv`. Without it the
/// monitor exits at startup with an "unsupported" error.
#[derive(Debug, Parser)]
#[command(version, about, long_about)]
struct Args {
    /// Settings file (TOML), optional
    #[arg(short, long, default_value = "drowsiness.toml")]
    config: PathBuf,

    /// Override the log level
    #[arg(long)]
    log_level: Option<String>,

    /// Play back images from this directory instead of the camera
    #[arg(long)]
    source_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = Settings::load_with(Some(&args.config), |settings| {
        if let Some(level) = args.log_level {
            settings.log.level = level;
        }
        if let Some(dir) = args.source_dir {
            settings.source.kind = SourceKind::Directory;
            settings.source.path = Some(dir);
        }
    })?;

    init_logging(&settings.log);
    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    // The model is loaded once, before any frame is captured
    let detector = build_detector(&settings).map_err(|e| {
        error!("{}", e);
        e
    })?;
    let dms = DmsModule::new(settings.detector.clone(), detector)?;
    let converter = BitmapConverter::new(settings.display.acceleration);
    let mut pipeline = Pipeline::new(dms, converter, build_sinks(&settings)?);

    let source = build_source(&settings).map_err(|e| {
        error!("{}", e);
        e
    })?;
    let (frames, capture) = CaptureTask::spawn(source, &settings.capture);

    let summary = pipeline
        .run(frames, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Ctrl-C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    capture.stop();
    match capture.join().await {
        Ok(stats) => info!(
            "Capture: {} frames, {} empty, {} dropped, {} failed",
            stats.captured, stats.empty, stats.dropped, stats.failed
        ),
        Err(e) => warn!("Capture ended with error: {}", e),
    }

    info!(
        "Processed {} frames ({} alert, {} drowsy), {} skipped, {} failed",
        summary.processed, summary.alert, summary.drowsy, summary.skipped, summary.failed
    );

    Ok(())
}
