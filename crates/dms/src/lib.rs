//! Driver Monitoring System (DMS)
//!
//! Per-frame driver status from eye detection:
//! - Detector input preparation (grayscale, histogram equalization)
//! - Eye detection through a pluggable detector
//! - Alert/Drowsy classification
//! - Detection box overlay

pub mod analysis;
pub mod annotate;
pub mod config;
pub mod detector;
pub mod status;

pub use analysis::{FrameAnalysis, ProcessedFrame};
pub use config::DmsConfig;
#[cfg(feature = "opencv")]
pub use detector::CascadeEyeDetector;
pub use detector::{DetectionParams, EyeDetector, EyeRegion};
pub use status::{classify, Status};

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::debug;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Driver monitoring module
pub struct DmsModule<D> {
    config: DmsConfig,
    params: DetectionParams,
    detector: D,
}

impl<D: EyeDetector> DmsModule<D> {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig, detector: D) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            params: config.detection_params(),
            config,
            detector,
        })
    }

    /// Process one capture cycle.
    ///
    /// `None` and empty frames are skipped without touching the detector.
    /// The frame is consumed; it comes back annotated on success and is
    /// dropped on every other path.
    pub fn process(
        &mut self,
        frame: Option<VideoFrame>,
    ) -> Result<Option<ProcessedFrame>, DmsError> {
        let Some(mut frame) = frame else {
            debug!("No frame this cycle");
            return Ok(None);
        };
        if frame.is_empty() {
            debug!("Empty frame {} skipped", frame.sequence);
            return Ok(None);
        }

        let analysis = self.analyze(&mut frame)?;
        Ok(Some(ProcessedFrame { frame, analysis }))
    }

    /// Detect, classify and annotate a single frame in place
    pub fn analyze(&mut self, frame: &mut VideoFrame) -> Result<FrameAnalysis, DmsError> {
        let input = detector::prepare_input(frame);
        let detections = self.detector.detect(&input, &self.params)?;
        let status = classify(&detections);

        if self.config.annotate {
            annotate::draw_detections(
                frame,
                &detections,
                self.config.box_color,
                self.config.box_thickness,
            );
        }

        debug!(
            "Frame {}: {} eye(s), {}",
            frame.sequence,
            detections.len(),
            status.as_str()
        );

        Ok(FrameAnalysis {
            sequence: frame.sequence,
            timestamp_ns: frame.timestamp_ns,
            status,
            detections,
        })
    }
}
