//! Detection box overlay

use camera_capture::frame::VideoFrame;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::warn;

use crate::config::MAX_BOX_THICKNESS;
use crate::detector::EyeRegion;

/// Draw a hollow box per detection directly into the frame buffer.
///
/// `color` is RGB and is written in the frame's channel order. Boxes are
/// clipped to the frame; zero-area regions are skipped. Returns the number
/// of boxes drawn. `thickness` is clamped to `1..=MAX_BOX_THICKNESS`.
pub fn draw_detections(
    frame: &mut VideoFrame,
    detections: &[EyeRegion],
    color: [u8; 3],
    thickness: u32,
) -> usize {
    if detections.is_empty() || frame.is_empty() {
        return 0;
    }

    if frame.data.len() < frame.expected_len() {
        warn!("Frame {} buffer does not match its size, skipping overlay", frame.sequence);
        return 0;
    }

    let (width, height) = (frame.width, frame.height);
    let pixel = Rgb(frame.format.encode(color));
    let data = std::mem::take(&mut frame.data);
    let Some(mut canvas) = RgbImage::from_raw(width, height, data) else {
        return 0;
    };

    let thickness = thickness.clamp(1, MAX_BOX_THICKNESS) as i64;
    // Keep arithmetic inside i32 for huge or far off-frame regions
    let margin = thickness + 1;
    let mut drawn = 0;

    for region in detections.iter().filter(|r| r.area() > 0) {
        let x0 = (region.x as i64).max(-margin);
        let y0 = (region.y as i64).max(-margin);
        let x1 = (region.x as i64 + region.width as i64).min(width as i64 + margin);
        let y1 = (region.y as i64 + region.height as i64).min(height as i64 + margin);
        if x1 <= x0 || y1 <= y0 {
            continue;
        }

        // Stroke straddles the box edge
        for k in (-(thickness - 1) / 2)..=(thickness / 2) {
            let w = x1 - x0 + 2 * k;
            let h = y1 - y0 + 2 * k;
            if w <= 0 || h <= 0 {
                continue;
            }
            let rect = Rect::at((x0 - k) as i32, (y0 - k) as i32).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, pixel);
        }
        drawn += 1;
    }

    frame.data = canvas.into_raw();
    drawn
}
