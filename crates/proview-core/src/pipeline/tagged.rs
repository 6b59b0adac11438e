//! Tag-table raster (TIFF) support.
//!
//! [`TagDirectory`] pulls the descriptive fields out of the first image
//! directory; [`TaggedDecoder`] decodes sample data with the `tiff` crate
//! directly, accepting color layouts the generic raster path rejects.

use exif::{Context, In, Value};
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use super::raster::{fit_within, TargetBox};
use crate::config::LimitsConfig;
use crate::error::{DecodeError, DecodeResult};
use crate::types::TaggedInfo;

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_ORIENTATION: u16 = 274;
const TAG_X_RESOLUTION: u16 = 282;
const TAG_Y_RESOLUTION: u16 = 283;
const TAG_RESOLUTION_UNIT: u16 = 296;

/// Descriptive fields of the primary image directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagDirectory {
    info: TaggedInfo,
}

impl TagDirectory {
    /// Read the primary directory. Unknown tags are ignored.
    pub fn parse(bytes: &[u8]) -> DecodeResult<Self> {
        Ok(Self {
            info: read_tags(bytes)?,
        })
    }

    pub fn info(&self) -> &TaggedInfo {
        &self.info
    }

    pub fn into_info(self) -> TaggedInfo {
        self.info
    }

    /// Declared dimensions, when both tags are present.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.info.width?, self.info.height?))
    }
}

fn read_tags(bytes: &[u8]) -> DecodeResult<TaggedInfo> {
    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(bytes))?;
    let mut info = TaggedInfo::default();

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY || field.tag.context() != Context::Tiff {
            continue;
        }
        let value = &field.value;
        match field.tag.number() {
            TAG_IMAGE_WIDTH => info.width = value.get_uint(0),
            TAG_IMAGE_LENGTH => info.height = value.get_uint(0),
            TAG_BITS_PER_SAMPLE => info.bits_per_sample = shorts(value),
            TAG_COMPRESSION => {
                info.compression = value.get_uint(0);
                info.compression_name = info.compression.map(compression_name);
            }
            TAG_ORIENTATION => info.orientation = value.get_uint(0).map(|v| v as u16),
            TAG_X_RESOLUTION => info.x_resolution = rational(value),
            TAG_Y_RESOLUTION => info.y_resolution = rational(value),
            TAG_RESOLUTION_UNIT => info.resolution_unit = value.get_uint(0).map(|v| v as u16),
            _ => {}
        }
    }

    Ok(info)
}

fn shorts(value: &Value) -> Vec<u16> {
    match value {
        Value::Short(v) => v.clone(),
        other => other
            .iter_uint()
            .map(|it| it.map(|v| v as u16).collect())
            .unwrap_or_default(),
    }
}

fn rational(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(v) => v.first().map(|r| r.to_f64()),
        other => other.get_uint(0).map(f64::from),
    }
}

/// Human-readable name of a compression scheme.
pub fn compression_name(code: u32) -> String {
    let name = match code {
        1 => "None",
        2 => "CCITT RLE",
        3 => "CCITT Group 3",
        4 => "CCITT Group 4",
        5 => "LZW",
        6 => "JPEG (old-style)",
        7 => "JPEG",
        8 | 32946 => "Deflate",
        32773 => "PackBits",
        34712 => "JPEG 2000",
        other => return format!("Unknown ({other})"),
    };
    name.to_string()
}

/// Sample-level decoder for tag-table rasters.
#[derive(Debug, Clone)]
pub struct TaggedDecoder {
    limits: LimitsConfig,
}

impl TaggedDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode and fit into `target`.
    pub fn decode(&self, bytes: &[u8], target: TargetBox) -> DecodeResult<DynamicImage> {
        Ok(fit_within(self.decode_full(bytes)?, target))
    }

    /// Decode the first image at full resolution.
    pub fn decode_full(&self, bytes: &[u8]) -> DecodeResult<DynamicImage> {
        // Reject oversized directories before the sample decoder allocates.
        let directory = TagDirectory::parse(bytes)?;
        if let Some((width, height)) = directory.dimensions() {
            self.check_limits(width, height)?;
        }

        let mut decoder = Decoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions()?;
        self.check_limits(width, height)?;

        let color = decoder.colortype()?;
        let samples = to_eight_bit(decoder.read_image()?)?;
        let rgba = to_rgba(color, width, height, &samples)?;
        Ok(DynamicImage::ImageRgba8(rgba))
    }

    fn check_limits(&self, width: u32, height: u32) -> DecodeResult<()> {
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(DecodeError::TooLarge {
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }
}

/// Signed samples are shifted so their minimum maps to 0.
fn to_eight_bit(result: DecodingResult) -> DecodeResult<Vec<u8>> {
    match result {
        DecodingResult::U8(v) => Ok(v),
        DecodingResult::U16(v) => Ok(v.into_iter().map(|s| (s >> 8) as u8).collect()),
        DecodingResult::I8(v) => Ok(v.into_iter().map(|s| (s as i16 + 128) as u8).collect()),
        DecodingResult::I16(v) => Ok(v
            .into_iter()
            .map(|s| ((s as i32 + 32768) >> 8) as u8)
            .collect()),
        _ => Err(DecodeError::Unsupported("non-integer or wide samples".into())),
    }
}

fn to_rgba(color: ColorType, width: u32, height: u32, samples: &[u8]) -> DecodeResult<RgbaImage> {
    let (channels, bits) = match color {
        ColorType::Gray(bits) => (1, bits),
        ColorType::GrayA(bits) => (2, bits),
        ColorType::RGB(bits) => (3, bits),
        ColorType::RGBA(bits) => (4, bits),
        ColorType::CMYK(bits) => (4, bits),
        other => return Err(DecodeError::Unsupported(format!("color type {other:?}"))),
    };
    if bits != 8 && bits != 16 {
        return Err(DecodeError::Unsupported(format!("{bits}-bit samples")));
    }

    let pixels = width as usize * height as usize;
    if samples.len() < pixels * channels {
        return Err(DecodeError::Truncated("sample data"));
    }

    let mut out = Vec::with_capacity(pixels * 4);
    for px in samples.chunks_exact(channels).take(pixels) {
        let rgba = match color {
            ColorType::Gray(_) => [px[0], px[0], px[0], 255],
            ColorType::GrayA(_) => [px[0], px[0], px[0], px[1]],
            ColorType::RGB(_) => [px[0], px[1], px[2], 255],
            ColorType::CMYK(_) => {
                let k = 255 - px[3] as u16;
                let ink = |c: u8| ((255 - c as u16) * k / 255) as u8;
                [ink(px[0]), ink(px[1]), ink(px[2]), 255]
            }
            _ => [px[0], px[1], px[2], px[3]],
        };
        out.extend_from_slice(&rgba);
    }

    RgbaImage::from_raw(width, height, out)
        .ok_or_else(|| DecodeError::Malformed("sample buffer size mismatch".into()))
}
