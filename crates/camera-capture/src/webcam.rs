//! Webcam capture through OpenCV `VideoCapture`

use std::time::Instant;

use opencv::core::{Mat, CV_8UC3};
use opencv::prelude::*;
use opencv::videoio;
use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, FrameSource, PixelFormat, VideoFrame};

fn stream_err(e: opencv::Error) -> CameraError {
    CameraError::Stream(e.to_string())
}

/// Webcam frame source yielding `Bgr24` frames
pub struct WebcamSource {
    config: CameraConfig,
    capture: Option<videoio::VideoCapture>,
    started: Instant,
    sequence: u32,
}

impl WebcamSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            capture: None,
            started: Instant::now(),
            sequence: 0,
        }
    }
}

impl FrameSource for WebcamSource {
    fn start(&mut self) -> Result<(), CameraError> {
        info!("Opening camera {}", self.config.device_index);
        let mut capture = videoio::VideoCapture::new(self.config.device_index, videoio::CAP_ANY)
            .map_err(|e| CameraError::Open(e.to_string()))?;

        if !capture.is_opened().map_err(|e| CameraError::Open(e.to_string()))? {
            return Err(CameraError::Open(format!(
                "device {} could not be opened",
                self.config.device_index
            )));
        }

        let props = [
            (videoio::CAP_PROP_FRAME_WIDTH, self.config.width as f64),
            (videoio::CAP_PROP_FRAME_HEIGHT, self.config.height as f64),
            (videoio::CAP_PROP_FPS, self.config.fps as f64),
        ];
        for (prop, value) in props {
            if !capture.set(prop, value).map_err(stream_err)? {
                warn!("Camera ignored property {} = {}", prop, value);
            }
        }

        self.capture = Some(capture);
        self.started = Instant::now();
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let capture = self.capture.as_mut().ok_or(CameraError::NotInitialized)?;

        // Released when this call returns, on every path
        let mut mat = Mat::default();
        if !capture.read(&mut mat).map_err(stream_err)? || mat.empty() {
            debug!("Camera returned no frame");
            return Ok(None);
        }

        if mat.typ() != CV_8UC3 {
            return Err(CameraError::Format(format!("unexpected Mat type {}", mat.typ())));
        }

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone().map_err(stream_err)?
        };

        let frame = VideoFrame::new(
            mat.data_bytes().map_err(stream_err)?.to_vec(),
            mat.cols() as u32,
            mat.rows() as u32,
            PixelFormat::Bgr24,
            self.started.elapsed().as_nanos() as u64,
            self.sequence,
        );
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }

    fn is_streaming(&self) -> bool {
        self.capture
            .as_ref()
            .and_then(|c| c.is_opened().ok())
            .unwrap_or(false)
    }

    fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                warn!("Failed to release camera: {}", e);
            }
            info!("Camera released");
        }
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.stop();
    }
}
