//! Synthetic placeholder rasters.
//!
//! Substituted whenever no decoder can produce a preview: a flat color per
//! format family with the format name drawn in a small built-in bitmap font,
//! and a neutral gray box as the last resort.

use image::{DynamicImage, Rgba, RgbaImage};

use super::classify::{FormatFamily, FormatTag};
use super::raster::TargetBox;

/// Last-resort fill.
pub const NEUTRAL_GRAY: Rgba<u8> = Rgba([200, 200, 200, 255]);

const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Background color used for a format's placeholder.
pub fn family_color(tag: FormatTag) -> Rgba<u8> {
    match tag.family() {
        FormatFamily::Layered => Rgba([0, 30, 54, 255]),
        FormatFamily::TaggedRaster => Rgba([38, 70, 83, 255]),
        FormatFamily::VectorPrint => Rgba([120, 60, 10, 255]),
        FormatFamily::StandardRaster => Rgba([70, 70, 80, 255]),
    }
}

/// Flat-colored box-sized raster labeled with the format name.
pub fn labeled(tag: FormatTag, target: TargetBox) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(target.width, target.height, family_color(tag));
    draw_label(&mut canvas, tag.label());
    DynamicImage::ImageRgba8(canvas)
}

/// Neutral gray box-sized raster.
pub fn neutral(target: TargetBox) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        target.width,
        target.height,
        NEUTRAL_GRAY,
    ))
}

/// Draw `text` centered on the canvas, scaled to roughly half its width.
///
/// Text that cannot fit even at scale 1 is skipped.
fn draw_label(canvas: &mut RgbaImage, text: &str) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return;
    }
    let text_width = chars * GLYPH_WIDTH + (chars - 1);
    let scale = u32::min(
        canvas.width() / 2 / text_width,
        canvas.height() / 4 / GLYPH_HEIGHT,
    );
    if scale == 0 {
        return;
    }

    let origin_x = (canvas.width() - text_width * scale) / 2;
    let origin_y = (canvas.height() - GLYPH_HEIGHT * scale) / 2;

    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else { continue };
        let glyph_x = origin_x + i as u32 * (GLYPH_WIDTH + 1) * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x0 = glyph_x + col * scale;
                let y0 = origin_y + row as u32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        canvas.put_pixel(x0 + dx, y0 + dy, LABEL_COLOR);
                    }
                }
            }
        }
    }
}

/// 5x7 bitmaps for the letters used by format labels.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01111, 0b10000, 0b10000, 0b10011, 0b10001, 0b10001, 0b01111],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        _ => return None,
    };
    Some(rows)
}
