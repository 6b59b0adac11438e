//! Core data types produced by the ingestion pipeline.
//!
//! An [`AssetRecord`] is built fresh for each ingested file and handed to the
//! presentation layer as immutable data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::pipeline::classify::FormatTag;

/// Everything the pipeline knows about one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    // === File Identification ===
    /// File location (absolute when it could be resolved)
    pub path: PathBuf,

    /// Just the filename portion
    pub name: String,

    /// Lowercased extension without the dot
    pub extension: String,

    // === Filesystem Snapshot ===
    /// File size in bytes
    pub size_bytes: u64,

    /// Creation time, when the filesystem reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Last modification time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    // === Image Properties ===
    /// Full-resolution source dimensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,

    /// Format decided by the classifier
    pub format: FormatTag,

    /// Format reported by the header probe (informational only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probed_format: Option<String>,

    // === Derived Outputs ===
    /// Bounded preview raster
    pub thumbnail: Thumbnail,

    /// Format-specific metadata
    pub metadata: MetadataExtension,
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An encoded preview raster.
#[derive(Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Encoded image bytes (base64 in serialized form)
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,

    /// Raster width in pixels
    pub width: u32,

    /// Raster height in pixels
    pub height: u32,

    /// MIME type of `data`
    pub mime: String,

    /// How the raster was produced
    pub origin: ThumbnailOrigin,
}

impl Thumbnail {
    pub fn is_placeholder(&self) -> bool {
        !matches!(self.origin, ThumbnailOrigin::Decoded { .. })
    }

    /// `data:` URI ready for an `<img>` element.
    pub fn data_uri(&self) -> String {
        use base64::Engine as _;
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("bytes", &self.data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime", &self.mime)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Provenance of a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ThumbnailOrigin {
    /// A real preview from the named decoder
    Decoded { decoder: String },
    /// Flat-color raster labeled with the format name
    Placeholder { label: String },
    /// Last-resort neutral gray raster
    Neutral,
}

/// Metadata fields produced by the extractor, before they are merged into a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Full-resolution dimensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,

    /// Format reported by the header probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probed_format: Option<String>,

    /// Format-specific extension
    pub extension: MetadataExtension,
}

/// Format-tagged metadata variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetadataExtension {
    #[default]
    None,
    Exif(ExifData),
    Layered(LayeredInfo),
    Tagged(TaggedInfo),
}

/// Camera capture metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ExifData {
    /// Every readable tag as a display string, keyed by tag name
    pub tags: BTreeMap<String, String>,

    /// Raw capture timestamp as stored in the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,

    /// Capture timestamp parsed to RFC 3339 (no timezone information, read as UTC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// "<make> <model>"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,

    /// Camera manufacturer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,

    /// Camera model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,

    /// Aperture (e.g., "f/2.8")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,

    /// Exposure time (e.g., "1/125 sec")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_time: Option<String>,

    /// ISO sensitivity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,

    /// Focal length in mm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f32>,

    /// Image orientation (1-8 per EXIF spec)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,

    /// GPS latitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,

    /// GPS longitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,
}

/// Structure of a layered document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayeredInfo {
    pub channels: u16,
    pub bits_per_channel: u16,
    pub color_mode: String,
    pub layers: Vec<LayerSummary>,
}

/// Read-only snapshot of one layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerSummary {
    pub name: String,
    pub visible: bool,
    /// 0 (transparent) to 255 (opaque)
    pub opacity: u8,
    pub width: u32,
    pub height: u32,
}

/// Fields read from a tag-table raster's directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaggedInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub bits_per_sample: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_unit: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u16>,
}

/// Counters for one directory ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestStats {
    /// Records emitted
    pub succeeded: usize,

    /// Files dropped from their batch
    pub failed: usize,

    /// Matching files beyond the candidate cap
    pub truncated: usize,

    /// Total processing time in seconds
    pub total_seconds: f64,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
