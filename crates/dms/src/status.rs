//! Per-frame driver status

use serde::{Deserialize, Serialize};

use crate::detector::EyeRegion;

/// Driver status for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// At least one eye visible
    Alert,
    /// No eyes found
    Drowsy,
}

impl Status {
    /// Label text shown to the driver
    pub fn label(&self) -> &'static str {
        match self {
            Status::Alert => "Alert",
            Status::Drowsy => "Drowsy!",
        }
    }

    /// Label color (RGB)
    pub fn color(&self) -> [u8; 3] {
        match self {
            Status::Alert => [0, 128, 0],
            Status::Drowsy => [255, 0, 0],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Alert => "alert",
            Status::Drowsy => "drowsy",
        }
    }
}

/// Classify one frame's detections.
///
/// Counts regions only: position and size are ignored, and nothing is
/// remembered between calls.
pub fn classify(detections: &[EyeRegion]) -> Status {
    if detections.is_empty() {
        Status::Drowsy
    } else {
        Status::Alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn region(x: i32, y: i32, width: u32, height: u32) -> EyeRegion {
        EyeRegion { x, y, width, height }
    }

    #[test]
    fn test_no_eyes_is_drowsy() {
        let status = classify(&[]);
        assert_eq!(status, Status::Drowsy);
        assert_eq!(status.label(), "Drowsy!");
        assert_eq!(status.color(), [255, 0, 0]);
    }

    #[test]
    fn test_one_eye_is_alert() {
        let status = classify(&[region(10, 10, 24, 24)]);
        assert_eq!(status, Status::Alert);
        assert_eq!(status.label(), "Alert");
        assert_eq!(status.color(), [0, 128, 0]);
    }

    #[test]
    fn test_zero_area_region_still_counts() {
        assert_eq!(classify(&[region(5, 5, 0, 0)]), Status::Alert);
    }

    #[test]
    fn test_history_does_not_matter() {
        let eyes = vec![region(0, 0, 10, 10), region(40, 0, 10, 10)];
        let none: Vec<EyeRegion> = Vec::new();
        let seq: Vec<Status> = [eyes.as_slice(), none.as_slice(), eyes.as_slice()]
            .iter()
            .map(|d| classify(d))
            .collect();
        assert_eq!(seq, vec![Status::Alert, Status::Drowsy, Status::Alert]);
    }

    proptest! {
        #[test]
        fn prop_any_detection_is_alert(
            regions in prop::collection::vec(
                (any::<i32>(), any::<i32>(), any::<u32>(), any::<u32>()),
                1..16,
            )
        ) {
            let regions: Vec<EyeRegion> = regions
                .into_iter()
                .map(|(x, y, w, h)| region(x, y, w, h))
                .collect();
            prop_assert_eq!(classify(&regions), Status::Alert);
            prop_assert_eq!(classify(&regions), classify(&regions));
        }
    }
}
