//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Directory ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Files processed concurrently per batch
    pub batch_size: usize,

    /// Maximum number of candidate files taken from one directory
    pub max_candidates: usize,

    /// Descend into subdirectories
    pub recursive: bool,

    /// Extensions picked up when listing a directory
    pub extensions: Vec<String>,

    /// Emitted batches buffered before the coordinator waits for the consumer
    pub channel_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_candidates: 200,
            recursive: false,
            extensions: ["psd", "eps", "tiff", "tif", "jpg", "jpeg", "png", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            channel_capacity: 4,
        }
    }
}

/// Thumbnail bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Maximum thumbnail width in pixels
    pub width: u32,

    /// Maximum thumbnail height in pixels
    pub height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Files above this size are not loaded; they get a placeholder and a header probe
    pub max_file_size_mb: u64,

    /// Maximum decoded dimension (width or height)
    pub max_image_dimension: u32,

    /// Per-file decode + metadata timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 512,
            max_image_dimension: 16384,
            decode_timeout_ms: 10000,
        }
    }
}

impl LimitsConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
