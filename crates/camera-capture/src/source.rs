//! Frame sources
//!
//! A source is pulled one frame at a time by the capture task. `Ok(None)`
//! means no frame was available on this cycle.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

/// Pull-model frame producer
pub trait FrameSource: Send {
    /// Begin streaming
    fn start(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    /// Read the next frame, `Ok(None)` when none is available this cycle
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Whether further reads may yield frames
    fn is_streaming(&self) -> bool;

    /// Stop streaming and release the device
    fn stop(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn start(&mut self) -> Result<(), CameraError> {
        (**self).start()
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).read_frame()
    }

    fn is_streaming(&self) -> bool {
        (**self).is_streaming()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Plays back still images from a directory in lexical order
pub struct ImageDirSource {
    files: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    frame_interval: Option<Duration>,
    started: Option<Instant>,
    sequence: u32,
    streaming: bool,
}

impl ImageDirSource {
    /// Scan a directory for image files
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        info!("Image source opened: {} frames from {}", files.len(), dir.display());

        Ok(Self {
            files,
            cursor: 0,
            looping: false,
            frame_interval: None,
            started: None,
            sequence: 0,
            streaming: false,
        })
    }

    /// Restart from the first image after the last one
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sleep between frames to emulate a camera frame rate
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Number of images in the directory
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageDirSource {
    fn start(&mut self) -> Result<(), CameraError> {
        self.cursor = 0;
        self.started = Some(Instant::now());
        self.streaming = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let started = self.started.ok_or(CameraError::NotInitialized)?;
        if !self.streaming {
            return Ok(None);
        }

        if self.cursor >= self.files.len() {
            if !self.looping {
                self.streaming = false;
                return Ok(None);
            }
            self.cursor = 0;
        }

        if let Some(interval) = self.frame_interval {
            if self.sequence > 0 {
                std::thread::sleep(interval);
            }
        }

        let path = &self.files[self.cursor];
        self.cursor += 1;

        debug!("Decoding frame {} from {}", self.sequence, path.display());
        let img = image::open(path)?.to_rgb8();

        let frame = VideoFrame::from_rgb_image(
            img,
            started.elapsed().as_nanos() as u64,
            self.sequence,
        );
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn stop(&mut self) {
        self.streaming = false;
    }
}
