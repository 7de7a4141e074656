//! Display sinks

use std::fs;
use std::path::PathBuf;

use dms::{FrameAnalysis, Status};
use image::RgbaImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::DisplayError;

/// Status label text and color (RGB)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
    pub text: &'static str,
    pub color: [u8; 3],
}

impl From<Status> for StatusLabel {
    fn from(status: Status) -> Self {
        Self {
            text: status.label(),
            color: status.color(),
        }
    }
}

/// Receives every displayable frame with its label
pub trait DisplaySink: Send {
    fn show(
        &mut self,
        bitmap: &RgbaImage,
        label: &StatusLabel,
        analysis: &FrameAnalysis,
    ) -> Result<(), DisplayError>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn show(
        &mut self,
        bitmap: &RgbaImage,
        label: &StatusLabel,
        analysis: &FrameAnalysis,
    ) -> Result<(), DisplayError> {
        (**self).show(bitmap, label, analysis)
    }
}

/// Reports labels through the log
#[derive(Debug, Default)]
pub struct LogSink {
    shown: Option<StatusLabel>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for LogSink {
    fn show(
        &mut self,
        bitmap: &RgbaImage,
        label: &StatusLabel,
        analysis: &FrameAnalysis,
    ) -> Result<(), DisplayError> {
        if self.shown.as_ref() != Some(label) {
            info!(
                "Status: {} (frame {}, {} eye(s))",
                label.text,
                analysis.sequence,
                analysis.eye_count()
            );
        } else {
            debug!(
                "Frame {} {}x{}: {}",
                analysis.sequence,
                bitmap.width(),
                bitmap.height(),
                label.text
            );
        }
        self.shown = Some(label.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusRecord<'a> {
    label: &'a StatusLabel,
    #[serde(flatten)]
    analysis: &'a FrameAnalysis,
}

/// Writes `latest.png` and `status.json` every N frames
pub struct SnapshotSink {
    dir: PathBuf,
    every: u64,
    seen: u64,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>, every: u64) -> Result<Self, DisplayError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| DisplayError::Snapshot(e.to_string()))?;
        info!("Writing snapshots to {}", dir.display());
        Ok(Self {
            dir,
            every: every.max(1),
            seen: 0,
        })
    }

    pub fn image_path(&self) -> PathBuf {
        self.dir.join("latest.png")
    }

    pub fn status_path(&self) -> PathBuf {
        self.dir.join("status.json")
    }
}

impl DisplaySink for SnapshotSink {
    fn show(
        &mut self,
        bitmap: &RgbaImage,
        label: &StatusLabel,
        analysis: &FrameAnalysis,
    ) -> Result<(), DisplayError> {
        let due = self.seen % self.every == 0;
        self.seen += 1;
        if !due {
            return Ok(());
        }

        bitmap
            .save(self.image_path())
            .map_err(|e| DisplayError::Snapshot(e.to_string()))?;

        let record = serde_json::to_vec_pretty(&StatusRecord { label, analysis })
            .map_err(|e| DisplayError::Snapshot(e.to_string()))?;
        fs::write(self.status_path(), record).map_err(|e| DisplayError::Snapshot(e.to_string()))?;

        debug!("Snapshot written for frame {}", analysis.sequence);
        Ok(())
    }
}
