//! Drowsiness Monitor
//!
//! Wires capture, eye detection and display together and owns the
//! application's settings and logging.

pub mod pipeline;
pub mod settings;

pub use pipeline::{Pipeline, RunSummary};
pub use settings::{LogSettings, Settings, SourceKind, SourceSettings};

use std::time::Duration;

use camera_capture::{CameraError, FrameSource, ImageDirSource};
use display::{DisplayError, DisplaySink, LogSink, SnapshotSink};
use dms::{DmsError, EyeDetector};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Detector error: {0}")]
    Dms(#[from] DmsError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("Feature unavailable: {0}")]
    Unsupported(String),
}

/// Initialize the global tracing subscriber
pub fn init_logging(settings: &LogSettings) {
    let level = settings.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set tracing subscriber");
}

/// Open the configured frame source
pub fn build_source(settings: &Settings) -> Result<Box<dyn FrameSource>, MonitorError> {
    match settings.source.kind {
        SourceKind::Directory => {
            let path = settings.source.path.as_ref().ok_or_else(|| {
                MonitorError::Unsupported("directory source without a path".into())
            })?;
            let mut source = ImageDirSource::open(path)?.looping(settings.source.looping);
            if settings.source.frame_interval_ms > 0 {
                source = source
                    .with_frame_interval(Duration::from_millis(settings.source.frame_interval_ms));
            }
            Ok(Box::new(source))
        }
        #[cfg(feature = "opencv")]
        SourceKind::Camera => Ok(Box::new(camera_capture::WebcamSource::new(
            settings.camera.clone(),
        ))),
        #[cfg(not(feature = "opencv"))]
        SourceKind::Camera => Err(MonitorError::Unsupported(
            "camera capture requires the `opencv` feature (rebuild with --features opencv)".into(),
        )),
    }
}

/// Load the eye detector model
pub fn build_detector(settings: &Settings) -> Result<Box<dyn EyeDetector>, MonitorError> {
    #[cfg(feature = "opencv")]
    {
        let detector = dms::CascadeEyeDetector::load(&settings.detector.cascade_path)?;
        Ok(Box::new(detector))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Err(MonitorError::Unsupported(format!(
            "cascade detector for {} requires the `opencv` feature (rebuild with --features opencv)",
            settings.detector.cascade_path
        )))
    }
}

/// Display sinks: always the log, plus snapshots when configured
pub fn build_sinks(settings: &Settings) -> Result<Vec<Box<dyn DisplaySink>>, MonitorError> {
    let mut sinks: Vec<Box<dyn DisplaySink>> = vec![Box::new(LogSink::new())];
    if let Some(dir) = &settings.display.snapshot_dir {
        sinks.push(Box::new(SnapshotSink::new(
            dir.clone(),
            settings.display.snapshot_every,
        )?));
    }
    Ok(sinks)
}
