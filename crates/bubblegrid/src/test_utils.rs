//! Shared test utilities: synthetic bubble sheets.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use crate::layout::{BubbleLayout, BubbleRect, GridSpec};

/// Two questions, options A-D, 20x20 bubbles on a 30 px pitch.
pub(crate) fn small_layout() -> BubbleLayout {
    let grid = GridSpec {
        origin_px: [10, 10],
        n_questions: 2,
        bubble_size_px: [20, 20],
        option_pitch_px: 30,
        question_pitch_px: 30,
    };
    BubbleLayout::from_grid("small", &["A", "B", "C", "D"], &grid).expect("valid grid")
}

/// Uniform gray image.
pub(crate) fn blank_sheet(w: u32, h: u32, bg_pix: u8) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([bg_pix]))
}

/// Paint a rectangle with a constant value.
pub(crate) fn fill_rect(img: &mut GrayImage, rect: &BubbleRect, pix: u8) {
    for y in rect.y..rect.y + rect.h {
        for x in rect.x..rect.x + rect.w {
            img.put_pixel(x, y, Luma([pix]));
        }
    }
}

/// Render a sheet for `layout` with one filled bubble per question.
///
/// `marks[i]` is the option index inked for question `i + 1`; `None` leaves
/// the question blank. The image extends 10 px past the layout on both axes.
pub(crate) fn render_sheet(
    layout: &BubbleLayout,
    marks: &[Option<usize>],
    bg_pix: u8,
    ink_pix: u8,
) -> GrayImage {
    let [w, h] = layout.required_size();
    let mut img = blank_sheet(w + 10, h + 10, bg_pix);
    for (q, mark) in layout.questions().iter().zip(marks) {
        if let Some(option) = mark {
            fill_rect(&mut img, &q.bubbles[*option], ink_pix);
        }
    }
    img
}

/// PNG-encode an image in memory.
pub(crate) fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("png encoding");
    buf.into_inner()
}
