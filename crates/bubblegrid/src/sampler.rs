//! Bubble sampling: mean grayscale intensity over each layout rectangle.
//!
//! Lower values mean more ink. Every rectangle is bounds-checked against the
//! image before any pixel is read; nothing is clipped.

use image::{DynamicImage, GrayImage};

use crate::layout::{BubbleLayout, BubbleRect};

/// Darkness vector of one question: mean intensity per option, in option order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuestionSample {
    /// 1-based question id.
    pub question: u32,
    /// Mean 8-bit intensity in `[0, 255]` per option bubble.
    pub darkness: Vec<f64>,
}

/// First layout rectangle found outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundsViolation {
    /// 1-based question id.
    pub question: u32,
    /// Option index within the question.
    pub option: usize,
    pub rect: BubbleRect,
    /// Image `[width, height]`.
    pub image_size: [u32; 2],
}

/// Decode raw sheet bytes in any format enabled in `image`.
pub fn decode_sheet(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Grayscale rendering used for sampling.
///
/// Already-gray 8-bit images are copied unchanged.
pub fn to_gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Check every layout rectangle against the image dimensions.
pub fn check_bounds(layout: &BubbleLayout, width: u32, height: u32) -> Result<(), BoundsViolation> {
    for q in layout.questions() {
        for (option, rect) in q.bubbles.iter().enumerate() {
            if !rect.fits_within(width, height) {
                return Err(BoundsViolation {
                    question: q.id,
                    option,
                    rect: *rect,
                    image_size: [width, height],
                });
            }
        }
    }
    Ok(())
}

/// Mean intensity of one rectangle.
///
/// The caller guarantees the rectangle lies inside the image and is non-empty.
pub(crate) fn mean_intensity(gray: &GrayImage, rect: &BubbleRect) -> f64 {
    let width = gray.width() as usize;
    let raw = gray.as_raw();
    let (x0, x1) = (rect.x as usize, (rect.x + rect.w) as usize);
    let mut sum: u64 = 0;
    for y in rect.y..rect.y + rect.h {
        let row = y as usize * width;
        sum += raw[row + x0..row + x1]
            .iter()
            .map(|&p| p as u64)
            .sum::<u64>();
    }
    sum as f64 / rect.area() as f64
}

/// Compute darkness vectors for every question of `layout`.
pub fn sample_layout(
    gray: &GrayImage,
    layout: &BubbleLayout,
) -> Result<Vec<QuestionSample>, BoundsViolation> {
    let (w, h) = gray.dimensions();
    check_bounds(layout, w, h)?;

    let samples = layout
        .questions()
        .iter()
        .map(|q| QuestionSample {
            question: q.id,
            darkness: q
                .bubbles
                .iter()
                .map(|rect| mean_intensity(gray, rect))
                .collect(),
        })
        .collect();
    Ok(samples)
}
