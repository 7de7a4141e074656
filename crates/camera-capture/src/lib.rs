//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides frame acquisition decoupled from frame processing.
//! Supports:
//! - Webcam capture through OpenCV (`opencv` feature)
//! - Playback of still images from a directory
//! - A capture task delivering frames over a bounded channel

pub mod capture;
pub mod frame;
pub mod source;
#[cfg(feature = "opencv")]
pub mod webcam;

pub use capture::{CaptureHandle, CaptureStats, CaptureTask};
pub use frame::{PixelFormat, VideoFrame};
pub use source::{FrameSource, ImageDirSource};
#[cfg(feature = "opencv")]
pub use webcam::WebcamSource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Camera not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index (0 is the system default camera)
    pub device_index: i32,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Requested FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Capture task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Bounded channel capacity between capture and processing
    pub channel_capacity: usize,
    /// Drop the newest frame when the channel is full instead of waiting
    pub drop_when_full: bool,
    /// Consecutive failed reads tolerated before capture gives up
    pub max_consecutive_failures: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 4,
            drop_when_full: true,
            max_consecutive_failures: 30,
        }
    }
}
