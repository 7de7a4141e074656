//! Display Output
//!
//! Converts annotated frames into display bitmaps and presents them with
//! the driver status label.

pub mod bitmap;
pub mod sink;

pub use bitmap::{AccelerationMode, BitmapConverter};
pub use sink::{DisplaySink, LogSink, SnapshotSink, StatusLabel};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Display error types
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Input frame is invalid or empty")]
    InvalidFrame,

    #[error("Vision backend is not properly configured: {0}")]
    Configuration(String),

    #[error("Failed to convert frame to bitmap")]
    Conversion(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to write snapshot: {0}")]
    Snapshot(String),
}

/// Display configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Memory mode the converter must run in
    pub acceleration: AccelerationMode,

    /// Directory for `latest.png` / `status.json`; disabled when unset
    pub snapshot_dir: Option<PathBuf>,

    /// Write a snapshot every N frames (0 behaves as 1)
    pub snapshot_every: u64,
}
