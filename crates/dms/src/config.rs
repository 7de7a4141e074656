//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::detector::DetectionParams;

/// Widest detection box stroke accepted, in pixels
pub const MAX_BOX_THICKNESS: u32 = 64;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye cascade model file, loaded once at startup
    pub cascade_path: String,

    /// Detector image pyramid step
    pub scale_factor: f64,

    /// Overlapping candidates required to keep a detection
    pub min_neighbors: i32,

    /// Smallest eye size considered (width, height); `None` means no limit
    pub min_eye_size: Option<(u32, u32)>,

    /// Draw detection boxes onto the frame
    pub annotate: bool,

    /// Detection box color (RGB)
    pub box_color: [u8; 3],

    /// Detection box stroke width in pixels
    pub box_thickness: u32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            cascade_path: "haarcascade_eye.xml".to_string(),
            scale_factor: 1.1,
            min_neighbors: 10,
            min_eye_size: None,
            annotate: true,
            box_color: [0, 0, 255],
            box_thickness: 2,
        }
    }
}

impl DmsConfig {
    /// Detector parameters derived from this config
    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
            min_size: self.min_eye_size,
        }
    }

    /// Check values the detector would reject
    pub fn validate(&self) -> Result<(), crate::DmsError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(crate::DmsError::Config(format!(
                "scale_factor must be a finite number greater than 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.min_neighbors < 0 {
            return Err(crate::DmsError::Config(format!(
                "min_neighbors must not be negative, got {}",
                self.min_neighbors
            )));
        }
        if self.box_thickness > MAX_BOX_THICKNESS {
            return Err(crate::DmsError::Config(format!(
                "box_thickness must be at most {}, got {}",
                MAX_BOX_THICKNESS, self.box_thickness
            )));
        }
        Ok(())
    }
}
