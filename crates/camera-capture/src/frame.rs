//! Video frame types and processing

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::CameraError;

/// Channel order of a 3-byte-per-pixel frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgb24,
    /// OpenCV native order
    Bgr24,
}

impl PixelFormat {
    /// Byte offsets of the red, green and blue samples within a pixel
    pub fn rgb_offsets(&self) -> [usize; 3] {
        match self {
            PixelFormat::Rgb24 => [0, 1, 2],
            PixelFormat::Bgr24 => [2, 1, 0],
        }
    }

    /// Reorder an RGB color into this format's channel order
    pub fn encode(&self, rgb: [u8; 3]) -> [u8; 3] {
        let [r, g, b] = self.rgb_offsets();
        let mut out = [0u8; 3];
        out[r] = rgb[0];
        out[g] = rgb[1];
        out[b] = rgb[2];
        out
    }
}

/// Decoded video frame (3 bytes per pixel)
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Channel order of `data`
    pub format: PixelFormat,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw pixel data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp_ns,
            sequence,
        }
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, PixelFormat::Rgb24, timestamp_ns, sequence)
    }

    /// True when the frame carries no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Byte length implied by the frame dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Get pixel at (x, y) as RGB
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(idx..idx + 3)?;
        let [r, g, b] = self.format.rgb_offsets();
        Some([px[r], px[g], px[b]])
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let [r, g, b] = self.format.rgb_offsets();
        let mut gray: Vec<u8> = self
            .data
            .chunks_exact(3)
            .take(self.width as usize * self.height as usize)
            .map(|px| {
                // Luminance formula: 0.299*R + 0.587*G + 0.114*B
                (px[r] as f32 * 0.299 + px[g] as f32 * 0.587 + px[b] as f32 * 0.114).round() as u8
            })
            .collect();

        // Short buffers are padded so the image always matches the frame size
        gray.resize(self.width as usize * self.height as usize, 0);
        GrayImage::from_raw(self.width, self.height, gray)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Copy into an RGB image, reordering channels if needed
    pub fn to_rgb_image(&self) -> Result<RgbImage, CameraError> {
        if self.data.len() != self.expected_len() {
            return Err(CameraError::Format(format!(
                "frame {} holds {} bytes, expected {} for {}x{}",
                self.sequence,
                self.data.len(),
                self.expected_len(),
                self.width,
                self.height
            )));
        }

        let data = match self.format {
            PixelFormat::Rgb24 => self.data.clone(),
            PixelFormat::Bgr24 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
        };

        RgbImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| CameraError::Format("pixel buffer too small".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgr_frame() -> VideoFrame {
        // 2x1: pure blue then pure red, stored BGR
        VideoFrame::new(vec![255, 0, 0, 0, 0, 255], 2, 1, PixelFormat::Bgr24, 0, 7)
    }

    #[test]
    fn test_get_pixel_honors_channel_order() {
        let frame = bgr_frame();
        assert_eq!(frame.get_pixel(0, 0), Some([0, 0, 255]));
        assert_eq!(frame.get_pixel(1, 0), Some([255, 0, 0]));
        assert_eq!(frame.get_pixel(2, 0), None);
    }

    #[test]
    fn test_to_rgb_image_swaps_bgr() {
        let img = bgr_frame().to_rgb_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_to_rgb_image_rejects_short_buffer() {
        let frame = VideoFrame::new(vec![0; 5], 2, 1, PixelFormat::Rgb24, 0, 0);
        assert!(matches!(frame.to_rgb_image(), Err(CameraError::Format(_))));
    }

    #[test]
    fn test_grayscale_same_for_both_orders() {
        let rgb = VideoFrame::new(vec![10, 200, 30], 1, 1, PixelFormat::Rgb24, 0, 0);
        let bgr = VideoFrame::new(vec![30, 200, 10], 1, 1, PixelFormat::Bgr24, 0, 0);
        assert_eq!(rgb.to_grayscale().as_raw(), bgr.to_grayscale().as_raw());
    }

    #[test]
    fn test_is_empty() {
        assert!(VideoFrame::new(vec![], 0, 0, PixelFormat::Rgb24, 0, 0).is_empty());
        assert!(!bgr_frame().is_empty());
    }

    #[test]
    fn test_encode_color() {
        assert_eq!(PixelFormat::Rgb24.encode([1, 2, 3]), [1, 2, 3]);
        assert_eq!(PixelFormat::Bgr24.encode([1, 2, 3]), [3, 2, 1]);
    }
}
