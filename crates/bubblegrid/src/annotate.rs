//! Operator-review overlay: outline the chosen bubble of every question.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::layout::{BubbleLayout, BubbleRect};
use crate::resolve::MarkStatus;
use crate::DetectedAnswer;

/// Overlay style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotateConfig {
    /// Produce an annotated image for every graded sheet.
    pub enable: bool,
    /// Outline thickness in pixels, growing outward from the bubble.
    pub thickness: u32,
    /// Outline color for [`MarkStatus::Marked`].
    pub marked_rgb: [u8; 3],
    /// Outline color for [`MarkStatus::Ambiguous`].
    pub ambiguous_rgb: [u8; 3],
}

impl AnnotateConfig {
    pub const DEFAULT_THICKNESS: u32 = 2;
    pub const DEFAULT_MARKED_RGB: [u8; 3] = [0, 255, 0];
    pub const DEFAULT_AMBIGUOUS_RGB: [u8; 3] = [255, 165, 0];
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            enable: true,
            thickness: Self::DEFAULT_THICKNESS,
            marked_rgb: Self::DEFAULT_MARKED_RGB,
            ambiguous_rgb: Self::DEFAULT_AMBIGUOUS_RGB,
        }
    }
}

/// Draw outlines on an RGB copy of `image`. The input is not modified.
///
/// Blank questions get no outline.
pub fn annotate(
    image: &DynamicImage,
    layout: &BubbleLayout,
    answers: &[DetectedAnswer],
    config: &AnnotateConfig,
) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for answer in answers {
        let color = match answer.status {
            MarkStatus::Marked => Rgb(config.marked_rgb),
            MarkStatus::Ambiguous => Rgb(config.ambiguous_rgb),
            MarkStatus::Blank => continue,
        };
        let Some(rect) = answer
            .option
            .and_then(|o| layout.question(answer.question)?.bubbles.get(o))
        else {
            continue;
        };
        draw_outline(&mut canvas, rect, config.thickness.max(1), color);
    }
    canvas
}

fn draw_outline(canvas: &mut RgbImage, rect: &BubbleRect, thickness: u32, color: Rgb<u8>) {
    for t in 0..thickness {
        let x = rect.x as i64 - t as i64;
        let y = rect.y as i64 - t as i64;
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            continue;
        };
        let w = rect.w.saturating_add(2 * t);
        let h = rect.h.saturating_add(2 * t);
        // imageproc clips rectangles that extend past the canvas.
        draw_hollow_rect_mut(canvas, Rect::at(x, y).of_size(w, h), color);
    }
}

/// PNG-encode an annotated image for in-memory display.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
