//! Extension-based format classification.
//!
//! The classifier is the single source of truth for an asset's format: it
//! looks only at the lowercased extension and never touches the file.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PipelineError;

/// Closed set of supported asset formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Psd,
    Eps,
    Tiff,
    Jpeg,
    Png,
    Gif,
    WebP,
}

/// Decoder family a format belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// Layered composite documents (PSD)
    Layered,
    /// Tag-table rasters (TIFF)
    TaggedRaster,
    /// Formats the `image` crate decodes directly
    StandardRaster,
    /// Vector/print formats with no available decoder (EPS)
    VectorPrint,
}

impl FormatTag {
    pub const ALL: [FormatTag; 7] = [
        FormatTag::Psd,
        FormatTag::Eps,
        FormatTag::Tiff,
        FormatTag::Jpeg,
        FormatTag::Png,
        FormatTag::Gif,
        FormatTag::WebP,
    ];

    /// Map a bare extension (any case, no dot) to a tag.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "psd" => Some(Self::Psd),
            "eps" => Some(Self::Eps),
            "tif" | "tiff" => Some(Self::Tiff),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn family(self) -> FormatFamily {
        match self {
            Self::Psd => FormatFamily::Layered,
            Self::Tiff => FormatFamily::TaggedRaster,
            Self::Eps => FormatFamily::VectorPrint,
            Self::Jpeg | Self::Png | Self::Gif | Self::WebP => FormatFamily::StandardRaster,
        }
    }

    /// Short uppercase name drawn on placeholder thumbnails.
    pub fn label(self) -> &'static str {
        match self {
            Self::Psd => "PSD",
            Self::Eps => "EPS",
            Self::Tiff => "TIFF",
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::WebP => "WEBP",
        }
    }

    /// The `image` crate format used by the standard decoder, if any.
    pub fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Tiff => Some(ImageFormat::Tiff),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Png => Some(ImageFormat::Png),
            Self::Gif => Some(ImageFormat::Gif),
            Self::WebP => Some(ImageFormat::WebP),
            Self::Psd | Self::Eps => None,
        }
    }

    /// Whether the format carries camera capture tags (EXIF).
    pub fn carries_capture_tags(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label().to_ascii_lowercase())
    }
}

/// Classify a path by its extension.
///
/// Unknown or missing extensions are rejected with
/// [`PipelineError::UnsupportedFormat`]; callers must not attempt a decode.
pub fn classify(path: &Path) -> Result<FormatTag, PipelineError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    FormatTag::from_extension(ext).ok_or_else(|| PipelineError::UnsupportedFormat {
        path: path.to_path_buf(),
        extension: if ext.is_empty() {
            "<none>".to_string()
        } else {
            ext.to_ascii_lowercase()
        },
    })
}
