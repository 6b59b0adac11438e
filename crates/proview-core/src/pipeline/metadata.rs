//! Metadata extraction.
//!
//! Every asset gets a cheap header probe (dimensions and detected format).
//! Format-specific extraction then layers on top of it: EXIF capture tags for
//! JPEG, the layer structure for PSD and the tag directory for TIFF. Each
//! step is independent; a failure drops only that step's fields.

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use super::classify::{classify, FormatTag};
use super::layered;
use super::tagged::TagDirectory;
use crate::types::{AssetMetadata, Dimensions, ExifData, MetadataExtension};

/// Bytes read from the start of a file to identify its format.
const PROBE_PREFIX_LEN: u64 = 64;

/// Extracts metadata from image files.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract metadata from a file on disk.
    ///
    /// Never fails: unreadable files and unsupported extensions yield empty
    /// metadata.
    pub fn extract(path: &Path) -> AssetMetadata {
        let Ok(tag) = classify(path) else {
            return AssetMetadata::default();
        };
        match std::fs::read(path) {
            Ok(bytes) => Self::extract_from_bytes(&bytes, tag),
            Err(e) => {
                tracing::debug!("Cannot read {:?} for metadata: {e}", path);
                AssetMetadata::default()
            }
        }
    }

    /// Extract metadata from in-memory bytes of a classified asset.
    pub fn extract_from_bytes(bytes: &[u8], tag: FormatTag) -> AssetMetadata {
        let mut metadata = Self::probe_bytes(bytes);

        metadata.extension = match tag {
            FormatTag::Psd => match layered::describe(bytes) {
                Ok((header, info)) => {
                    metadata.dimensions = Some(Dimensions::new(header.width, header.height));
                    MetadataExtension::Layered(info)
                }
                Err(e) => {
                    tracing::debug!("PSD metadata unavailable: {e}");
                    MetadataExtension::None
                }
            },
            FormatTag::Tiff => match TagDirectory::parse(bytes) {
                Ok(directory) => {
                    if let Some((width, height)) = directory.dimensions() {
                        metadata.dimensions = Some(Dimensions::new(width, height));
                    }
                    MetadataExtension::Tagged(directory.into_info())
                }
                Err(e) => {
                    tracing::debug!("TIFF tag directory unavailable: {e}");
                    MetadataExtension::None
                }
            },
            tag if tag.carries_capture_tags() => Self::exif_from_bytes(bytes)
                .map(MetadataExtension::Exif)
                .unwrap_or_default(),
            _ => MetadataExtension::None,
        };

        metadata
    }

    /// Header-only probe of a file, without reading its body.
    pub fn probe_file(path: &Path) -> AssetMetadata {
        let dimensions = match imagesize::size(path) {
            Ok(size) => Some(Dimensions::new(size.width as u32, size.height as u32)),
            Err(e) => {
                tracing::debug!("Header probe failed for {:?}: {e}", path);
                None
            }
        };

        let mut prefix = Vec::new();
        let probed_format = std::fs::File::open(path)
            .and_then(|file| file.take(PROBE_PREFIX_LEN).read_to_end(&mut prefix))
            .ok()
            .and_then(|_| imagesize::image_type(&prefix).ok())
            .map(probe_name);

        AssetMetadata {
            dimensions,
            probed_format,
            extension: MetadataExtension::None,
        }
    }

    fn probe_bytes(bytes: &[u8]) -> AssetMetadata {
        AssetMetadata {
            dimensions: imagesize::blob_size(bytes)
                .ok()
                .map(|size| Dimensions::new(size.width as u32, size.height as u32)),
            probed_format: imagesize::image_type(bytes).ok().map(probe_name),
            extension: MetadataExtension::None,
        }
    }

    /// Parse EXIF capture tags.
    ///
    /// Returns `None` if the data has no EXIF block or it cannot be parsed.
    pub fn exif_from_bytes(bytes: &[u8]) -> Option<ExifData> {
        let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => exif,
            Err(e) => {
                tracing::debug!("No EXIF data: {e}");
                return None;
            }
        };

        let camera_make = Self::get_ascii(&exif, Tag::Make);
        let camera_model = Self::get_ascii(&exif, Tag::Model);
        let captured_at = Self::get_datetime(&exif);

        Some(ExifData {
            tags: Self::tag_map(&exif),
            created: captured_at.as_deref().and_then(parse_exif_datetime),
            captured_at,
            camera: match (&camera_make, &camera_model) {
                (Some(make), Some(model)) => Some(format!("{make} {model}")),
                _ => None,
            },
            camera_make,
            camera_model,
            aperture: Self::get_rational(&exif, Tag::FNumber).map(format_aperture),
            exposure_time: Self::get_rational(&exif, Tag::ExposureTime).and_then(format_exposure),
            iso: Self::get_u32(&exif, Tag::PhotographicSensitivity),
            focal_length: Self::get_rational(&exif, Tag::FocalLength).map(|v| v as f32),
            orientation: Self::get_u32(&exif, Tag::Orientation),
            gps_latitude: Self::get_gps_coord(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
            gps_longitude: Self::get_gps_coord(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
        })
    }

    /// Every primary-image field as a display string.
    fn tag_map(exif: &Exif) -> BTreeMap<String, String> {
        exif.fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .map(|f| {
                let value = f.display_value().with_unit(exif).to_string();
                (f.tag.to_string(), value.trim_matches('"').to_string())
            })
            .collect()
    }

    fn get_ascii(exif: &Exif, tag: Tag) -> Option<String> {
        let field = exif.get_field(tag, In::PRIMARY)?;
        let Value::Ascii(parts) = &field.value else {
            return None;
        };
        let text = parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string())?;
        (!text.is_empty()).then_some(text)
    }

    fn get_u32(exif: &Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    }

    fn get_rational(exif: &Exif, tag: Tag) -> Option<f64> {
        exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
            Value::Rational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
            _ => None,
        })
    }

    /// Capture datetime, preferring DateTimeOriginal over DateTime.
    fn get_datetime(exif: &Exif) -> Option<String> {
        [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .find_map(|tag| Self::get_ascii(exif, tag))
    }

    /// GPS coordinate, converted from degrees/minutes/seconds to decimal.
    fn get_gps_coord(exif: &Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let reference = Self::get_ascii(exif, ref_tag)?;

        let degrees = match &coord.value {
            Value::Rational(r) if r.len() >= 3 => {
                r[0].to_f64() + r[1].to_f64() / 60.0 + r[2].to_f64() / 3600.0
            }
            _ => return None,
        };
        let sign = if reference.starts_with('S') || reference.starts_with('W') {
            -1.0
        } else {
            1.0
        };
        Some(sign * degrees)
    }
}

/// Lowercase name of a detected header type ("jpeg", "psd", ...).
fn probe_name(kind: imagesize::ImageType) -> String {
    format!("{kind:?}").to_lowercase()
}

/// "2023:07:14 09:30:00" as RFC 3339, read as UTC.
fn parse_exif_datetime(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().to_rfc3339())
}

/// `2.8` → "f/2.8", `8.0` → "f/8".
fn format_aperture(f_number: f64) -> String {
    let text = format!("{f_number:.1}");
    format!("f/{}", text.trim_end_matches(".0"))
}

/// `0.008` → "1/125 sec", `2.0` → "2 sec".
fn format_exposure(seconds: f64) -> Option<String> {
    if seconds <= 0.0 || !seconds.is_finite() {
        return None;
    }
    if seconds >= 1.0 {
        let text = format!("{seconds:.1}");
        return Some(format!("{} sec", text.trim_end_matches(".0")));
    }
    Some(format!("1/{} sec", (1.0 / seconds).round() as u64))
}
