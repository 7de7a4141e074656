//! DMS analysis results

use camera_capture::frame::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::detector::EyeRegion;
use crate::status::Status;

/// Result of analyzing one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Sequence number of the analyzed frame
    pub sequence: u32,

    /// Capture timestamp of the analyzed frame (nanoseconds)
    pub timestamp_ns: u64,

    /// Status derived from this frame alone
    pub status: Status,

    /// Eye regions reported by the detector
    pub detections: Vec<EyeRegion>,
}

impl FrameAnalysis {
    pub fn eye_count(&self) -> usize {
        self.detections.len()
    }

    pub fn is_drowsy(&self) -> bool {
        self.status == Status::Drowsy
    }
}

/// Annotated frame together with its analysis
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: VideoFrame,
    pub analysis: FrameAnalysis,
}
