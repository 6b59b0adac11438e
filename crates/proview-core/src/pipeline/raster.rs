//! Raster helpers shared by every decoder: bounding boxes, fitting, encoding.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::config::ThumbnailConfig;
use crate::error::DecodeResult;

/// Requested thumbnail bounding box. Both sides are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBox {
    pub width: u32,
    pub height: u32,
}

impl TargetBox {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Whether a raster of the given size fits inside the box.
    pub fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }
}

impl Default for TargetBox {
    fn default() -> Self {
        Self::new(200, 200)
    }
}

impl From<ThumbnailConfig> for TargetBox {
    fn from(config: ThumbnailConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

/// Aspect-preserving fit into `target`, never enlarging.
///
/// Images that already fit are returned unchanged.
pub fn fit_within(image: DynamicImage, target: TargetBox) -> DynamicImage {
    let (width, height) = image.dimensions();
    if target.contains(width, height) {
        return image;
    }
    let (w, h) = fitted_dimensions(width, height, target);
    image.resize_exact(w, h, FilterType::Triangle)
}

/// Dimensions of a `width`×`height` raster fitted inside `target`.
pub fn fitted_dimensions(width: u32, height: u32, target: TargetBox) -> (u32, u32) {
    if target.contains(width, height) || width == 0 || height == 0 {
        return (width, height);
    }
    let scale = f64::min(
        target.width as f64 / width as f64,
        target.height as f64 / height as f64,
    );
    let w = ((width as f64 * scale).round() as u32).clamp(1, target.width);
    let h = ((height as f64 * scale).round() as u32).clamp(1, target.height);
    (w, h)
}

/// Encode a raster as PNG.
pub fn encode_png(image: &DynamicImage) -> DecodeResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_box_clamps_zero() {
        let target = TargetBox::new(0, 0);
        assert_eq!(target, TargetBox::new(1, 1));
    }

    #[test]
    fn test_fit_landscape() {
        assert_eq!(fitted_dimensions(1000, 500, TargetBox::new(200, 200)), (200, 100));
    }

    #[test]
    fn test_fit_portrait() {
        assert_eq!(fitted_dimensions(300, 1200, TargetBox::new(200, 200)), (50, 200));
    }

    #[test]
    fn test_fit_never_enlarges() {
        assert_eq!(fitted_dimensions(64, 32, TargetBox::new(200, 200)), (64, 32));
        let img = DynamicImage::new_rgba8(64, 32);
        let fitted = fit_within(img, TargetBox::new(200, 200));
        assert_eq!(fitted.dimensions(), (64, 32));
    }

    #[test]
    fn test_fit_extreme_aspect_keeps_one_pixel() {
        let (w, h) = fitted_dimensions(10000, 1, TargetBox::new(100, 100));
        assert_eq!((w, h), (100, 1));
    }

    #[test]
    fn test_fit_within_resizes() {
        let img = DynamicImage::new_rgb8(1000, 500);
        let fitted = fit_within(img, TargetBox::new(200, 200));
        assert_eq!(fitted.dimensions(), (200, 100));
    }

    #[test]
    fn test_encode_png_signature() {
        let img = DynamicImage::new_rgba8(4, 4);
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[0..4], &[0x89, b'P', b'N', b'G']);
    }
}
