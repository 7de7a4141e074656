//! Layered settings: defaults, optional TOML file, `DROWSY__*` environment

use std::path::{Path, PathBuf};

use camera_capture::{CameraConfig, CaptureConfig};
use config::{Config, Environment, File};
use display::DisplayConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Where frames come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Webcam through OpenCV
    #[default]
    Camera,
    /// Still images played back from a directory
    Directory,
}

/// Frame source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// Image directory for `kind = "directory"`
    pub path: Option<PathBuf>,
    /// Restart the directory after the last image
    pub looping: bool,
    /// Delay between directory frames (ms), 0 for none
    pub frame_interval_ms: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Camera,
            path: None,
            looping: false,
            frame_interval_ms: 33,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete monitor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub camera: CameraConfig,
    pub capture: CaptureConfig,
    pub detector: DmsConfig,
    pub display: DisplayConfig,
    pub log: LogSettings,
}

impl Settings {
    /// Load settings; the file is optional, environment wins over the file
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        Self::load_with(path, |_| {})
    }

    /// Load settings, then apply command-line `overrides` before validating
    pub fn load_with(
        path: Option<&Path>,
        overrides: impl FnOnce(&mut Settings),
    ) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let mut settings: Settings = builder
            .add_source(
                Environment::with_prefix("DROWSY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        overrides(&mut settings);
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), MonitorError> {
        if self.source.kind == SourceKind::Directory && self.source.path.is_none() {
            return Err(MonitorError::Settings(config::ConfigError::Message(
                "source.path is required when source.kind = \"directory\"".into(),
            )));
        }
        self.detector.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display::AccelerationMode;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.source.kind, SourceKind::Camera);
        assert_eq!(settings.detector.min_neighbors, 10);
        assert_eq!(settings.detector.cascade_path, "haarcascade_eye.xml");
        assert_eq!(settings.display.acceleration, AccelerationMode::Cpu);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.capture.channel_capacity, 4);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drowsiness.toml");
        std::fs::write(
            &path,
            r#"
[source]
kind = "directory"
path = "/tmp/frames"
looping = true

[detector]
min_neighbors = 6
box_thickness = 3

[display]
acceleration = "opencl"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.source.kind, SourceKind::Directory);
        assert!(settings.source.looping);
        assert_eq!(settings.detector.min_neighbors, 6);
        assert_eq!(settings.detector.box_thickness, 3);
        assert_eq!(settings.detector.scale_factor, 1.1);
        assert_eq!(settings.display.acceleration, AccelerationMode::OpenCl);
    }

    #[test]
    fn test_directory_source_requires_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drowsiness.toml");
        std::fs::write(&path, "[source]\nkind = \"directory\"\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(MonitorError::Settings(_))
        ));
    }

    #[test]
    fn test_override_satisfies_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drowsiness.toml");
        std::fs::write(&path, "[source]\nkind = \"directory\"\n").unwrap();

        let frames = dir.path().join("frames");
        let settings = Settings::load_with(Some(&path), |s| {
            s.source.path = Some(frames.clone());
        })
        .unwrap();
        assert_eq!(settings.source.kind, SourceKind::Directory);
        assert_eq!(settings.source.path, Some(frames));
    }

    #[test]
    fn test_overrides_are_validated() {
        let result = Settings::load_with(None, |s| {
            s.source.kind = SourceKind::Directory;
        });
        assert!(matches!(result, Err(MonitorError::Settings(_))));
    }
}
