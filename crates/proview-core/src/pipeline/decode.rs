//! Standard raster decoding (JPEG, PNG, GIF, WebP, baseline TIFF).

use image::{DynamicImage, ImageReader, Limits};
use std::io::Cursor;

use super::classify::FormatTag;
use super::raster::{fit_within, TargetBox};
use crate::config::LimitsConfig;
use crate::error::{DecodeError, DecodeResult};

/// Decoder for everything the `image` crate reads natively.
#[derive(Debug, Clone)]
pub struct StandardDecoder {
    limits: LimitsConfig,
}

impl StandardDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode `bytes` as `tag` and fit the result into `target`.
    pub fn decode(&self, bytes: &[u8], tag: FormatTag, target: TargetBox) -> DecodeResult<DynamicImage> {
        let image = self.decode_full(bytes, tag)?;
        Ok(fit_within(image, target))
    }

    /// Decode `bytes` at full resolution.
    ///
    /// The byte format comes from the classifier's tag; content is never
    /// sniffed to pick a different decoder.
    pub fn decode_full(&self, bytes: &[u8], tag: FormatTag) -> DecodeResult<DynamicImage> {
        let format = tag
            .image_format()
            .ok_or(DecodeError::NoDecoder(tag.label()))?;

        let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(self.decoder_limits());
        Ok(reader.decode()?)
    }

    fn decoder_limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.limits.max_image_dimension);
        limits.max_image_height = Some(self.limits.max_image_dimension);
        limits
    }
}
