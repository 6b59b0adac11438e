//! Error types for the ProView ingestion pipeline.
//!
//! Filesystem access on the originating path or directory surfaces to
//! callers, as does a standard raster whose content no decoder or header
//! probe recognizes. Other decoder failures are modelled separately as
//! [`DecodeError`] and recovered inside the pipeline (placeholder
//! thumbnails, omitted metadata fields).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for ProView operations.
#[derive(Error, Debug)]
pub enum ProviewError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors that cross the pipeline boundary.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Extension is not in the classifier's allow-list. Rejected before any I/O.
    #[error("Unsupported format for {path}: {extension}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// The file could not be read (missing, permission denied, ...)
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path exists but is not a regular file
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// The directory could not be enumerated
    #[error("Cannot list directory {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content matched no decoder and not even its header could be read
    #[error("Unreadable {format} file {path}: no decoder recognized its content")]
    Unreadable { path: PathBuf, format: &'static str },

    /// Even the neutral fallback raster could not be encoded
    #[error("Thumbnail encoding failed for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Export (format conversion) failed
    #[error("Export of {path} failed: {message}")]
    Export { path: PathBuf, message: String },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single decoder could not produce a raster.
///
/// Never fatal: the thumbnail ladder moves on to the next strategy and the
/// metadata extractor drops the affected fields.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Byte stream ended before a structure was complete
    #[error("truncated data: {0}")]
    Truncated(&'static str),

    /// Structurally invalid data
    #[error("malformed data: {0}")]
    Malformed(String),

    /// Valid but not something this decoder handles
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Declared dimensions exceed the configured limit
    #[error("image too large: {width}x{height} > {max_dim}")]
    TooLarge { width: u32, height: u32, max_dim: u32 },

    /// No real decoder exists for this format family
    #[error("no decoder available for {0}")]
    NoDecoder(&'static str),

    /// Error from the `image` crate
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Error from the `tiff` crate
    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),

    /// Error from the EXIF/tag-table reader
    #[error(transparent)]
    Exif(#[from] exif::Error),
}

/// Convenience type alias for ProView results.
pub type Result<T> = std::result::Result<T, ProviewError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for single-decoder results.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
