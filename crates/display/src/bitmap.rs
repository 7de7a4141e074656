//! Frame to display bitmap conversion

use camera_capture::frame::VideoFrame;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::DisplayError;

/// Memory mode required of the vision backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelerationMode {
    /// Plain host memory
    #[default]
    Cpu,
    /// OpenCL with device-compatible memory
    OpenCl,
}

/// Converts annotated frames into RGBA display bitmaps
pub struct BitmapConverter {
    mode: AccelerationMode,
    opencl_ready: bool,
}

impl BitmapConverter {
    /// Create a converter, enabling OpenCL when requested and available
    pub fn new(mode: AccelerationMode) -> Self {
        let opencl_ready = mode == AccelerationMode::OpenCl && enable_opencl();
        if mode == AccelerationMode::OpenCl && !opencl_ready {
            warn!("OpenCL requested but unavailable; every conversion will fail");
        }
        info!("Bitmap converter ready: mode={:?}", mode);
        Self { mode, opencl_ready }
    }

    /// Convert a frame for display.
    ///
    /// Fails with `InvalidFrame` for empty input, `Configuration` when the
    /// requested memory mode is unavailable, and `Conversion` for anything
    /// else, carrying the underlying cause.
    pub fn to_bitmap(&self, frame: &VideoFrame) -> Result<RgbaImage, DisplayError> {
        if frame.is_empty() {
            return Err(DisplayError::InvalidFrame);
        }

        if self.mode == AccelerationMode::OpenCl && !self.opencl_ready {
            return Err(DisplayError::Configuration(
                "OpenCL must be enabled with compatible device memory".into(),
            ));
        }

        let rgb = frame
            .to_rgb_image()
            .map_err(|e| DisplayError::Conversion(Box::new(e)))?;
        Ok(DynamicImage::ImageRgb8(rgb).to_rgba8())
    }
}

/// Turn on OpenCL and check the default device can share host memory.
///
/// A device qualifies when it is available and has either host unified
/// memory or any shared virtual memory capability.
#[cfg(feature = "opencv")]
fn enable_opencl() -> bool {
    use opencv::core;
    use opencv::prelude::*;

    match core::have_opencl() {
        Ok(true) => {}
        Ok(false) => return false,
        Err(e) => {
            warn!("OpenCL availability check failed: {}", e);
            return false;
        }
    }
    if !(core::set_use_opencl(true).is_ok() && core::use_opencl().unwrap_or(false)) {
        return false;
    }

    let device_info = core::Device::get_default().and_then(|device| {
        Ok((
            device.available()?,
            device.host_unified_memory()?,
            device.svm_capabilities()?,
        ))
    });
    match device_info {
        Ok((available, unified, svm)) => {
            let compatible = device_memory_compatible(available, unified, svm);
            if !compatible {
                warn!(
                    "OpenCL device memory incompatible: available={}, host_unified={}, svm={:#x}",
                    available, unified, svm
                );
                let _ = core::set_use_opencl(false);
            }
            compatible
        }
        Err(e) => {
            warn!("OpenCL device query failed: {}", e);
            let _ = core::set_use_opencl(false);
            false
        }
    }
}

#[cfg(feature = "opencv")]
fn device_memory_compatible(available: bool, host_unified: bool, svm_capabilities: i32) -> bool {
    available && (host_unified || svm_capabilities != 0)
}

#[cfg(not(feature = "opencv"))]
fn enable_opencl() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::{CameraError, PixelFormat};
    use std::error::Error;

    #[test]
    fn test_converts_bgr_to_rgba() {
        let frame = VideoFrame::new(vec![255, 0, 0, 0, 255, 0], 2, 1, PixelFormat::Bgr24, 0, 0);
        let bitmap = BitmapConverter::new(AccelerationMode::Cpu)
            .to_bitmap(&frame)
            .unwrap();

        assert_eq!(bitmap.dimensions(), (2, 1));
        assert_eq!(bitmap.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(bitmap.get_pixel(1, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn test_empty_frame_is_invalid() {
        let frame = VideoFrame::new(Vec::new(), 0, 0, PixelFormat::Rgb24, 0, 0);
        let err = BitmapConverter::new(AccelerationMode::Cpu)
            .to_bitmap(&frame)
            .unwrap_err();
        assert!(matches!(err, DisplayError::InvalidFrame));
    }

    #[test]
    fn test_malformed_buffer_keeps_cause() {
        let frame = VideoFrame::new(vec![0; 7], 2, 2, PixelFormat::Rgb24, 0, 3);
        let err = BitmapConverter::new(AccelerationMode::Cpu)
            .to_bitmap(&frame)
            .unwrap_err();

        assert!(matches!(err, DisplayError::Conversion(_)));
        let cause = err.source().unwrap();
        assert!(cause.downcast_ref::<CameraError>().is_some());
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_opencl_without_backend_is_misconfigured() {
        let frame = VideoFrame::new(vec![0; 12], 2, 2, PixelFormat::Rgb24, 0, 0);
        let err = BitmapConverter::new(AccelerationMode::OpenCl)
            .to_bitmap(&frame)
            .unwrap_err();
        assert!(matches!(err, DisplayError::Configuration(_)));
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_device_memory_must_be_shared_with_host() {
        assert!(device_memory_compatible(true, true, 0));
        assert!(device_memory_compatible(true, false, 0x1));
        assert!(!device_memory_compatible(true, false, 0));
        assert!(!device_memory_compatible(false, true, 0x1));
    }

    #[cfg(feature = "opencv")]
    #[test]
    fn test_opencl_conversion_follows_device_check() {
        let frame = VideoFrame::new(vec![0; 12], 2, 2, PixelFormat::Rgb24, 0, 0);
        let converter = BitmapConverter::new(AccelerationMode::OpenCl);
        let result = converter.to_bitmap(&frame);
        if converter.opencl_ready {
            assert!(result.is_ok());
        } else {
            assert!(matches!(result, Err(DisplayError::Configuration(_))));
        }
    }

    #[test]
    fn test_invalid_frame_checked_before_configuration() {
        let frame = VideoFrame::new(Vec::new(), 0, 0, PixelFormat::Rgb24, 0, 0);
        let err = BitmapConverter::new(AccelerationMode::OpenCl)
            .to_bitmap(&frame)
            .unwrap_err();
        assert!(matches!(err, DisplayError::InvalidFrame));
    }
}
