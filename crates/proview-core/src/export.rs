//! Re-encoding assets into common delivery formats.
//!
//! Source decoding goes through the same format dispatch as thumbnails, so
//! anything that yields a real thumbnail (layered documents included) can be
//! exported. Placeholders are never exported.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{DecodeResult, PipelineError, PipelineResult};
use crate::pipeline::{classify, fit_within, TargetBox, ThumbnailGenerator};

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 90;

/// Output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Jpeg,
    Png,
    Tiff,
    /// Lossless only
    Webp,
}

impl ExportFormat {
    /// Parse a format name or file extension (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Infer the format from a destination path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::parse)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
        }
    }
}

/// Clockwise rotation applied before resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Map degrees to a rotation. Only multiples of 90 are accepted;
    /// negative values rotate counter-clockwise.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Self::None),
            90 => Some(Self::Cw90),
            180 => Some(Self::Cw180),
            270 => Some(Self::Cw270),
            _ => None,
        }
    }

    fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Self::None => image,
            Self::Cw90 => image.rotate90(),
            Self::Cw180 => image.rotate180(),
            Self::Cw270 => image.rotate270(),
        }
    }
}

/// How to re-encode an asset.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Output format; inferred from the destination extension when `None`
    pub format: Option<ExportFormat>,
    /// JPEG quality, 1-100
    pub quality: u8,
    pub rotation: Rotation,
    /// Fit inside this box, never enlarging
    pub resize: Option<TargetBox>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: None,
            quality: DEFAULT_QUALITY,
            rotation: Rotation::None,
            resize: None,
        }
    }
}

/// What was written.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    /// Decoder that produced the source raster
    pub decoder: String,
}

/// Decode `src`, transform it, and write it to `dst`.
///
/// Parent directories of `dst` are created. Fails with
/// [`PipelineError::Export`] when no decoder can read the source or the
/// destination format cannot be determined.
pub async fn convert(
    generator: &ThumbnailGenerator,
    src: &Path,
    dst: &Path,
    options: &ExportOptions,
) -> PipelineResult<ExportSummary> {
    let export_error = |message: String| PipelineError::Export {
        path: src.to_path_buf(),
        message,
    };

    let tag = classify(src)?;
    let format = options
        .format
        .or_else(|| ExportFormat::from_path(dst))
        .ok_or_else(|| export_error(format!("cannot infer output format from {:?}", dst)))?;

    let bytes = tokio::fs::read(src)
        .await
        .map_err(|e| PipelineError::io(src, e))?;

    let generator = generator.clone();
    let options = options.clone();
    let encoded = tokio::task::spawn_blocking(move || {
        let resolved = generator
            .decode_full(&bytes, tag)
            .map_err(|exhausted| {
                if exhausted.failures.is_empty() {
                    format!("no decoder available for {tag}")
                } else {
                    exhausted.to_string()
                }
            })?;
        let mut image = options.rotation.apply(resolved.value);
        if let Some(target) = options.resize {
            image = fit_within(image, target);
        }
        let (width, height) = image.dimensions();
        let data = encode(&image, format, options.quality).map_err(|e| e.to_string())?;
        Ok::<_, String>((data, width, height, resolved.strategy.name()))
    })
    .await
    .map_err(|e| export_error(format!("export worker failed: {e}")))?
    .map_err(export_error)?;
    let (data, width, height, decoder) = encoded;

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    tokio::fs::write(dst, &data)
        .await
        .map_err(|e| PipelineError::io(dst, e))?;

    tracing::info!(
        "Exported {:?} -> {:?} ({}x{} {:?})",
        src,
        dst,
        width,
        height,
        format
    );

    Ok(ExportSummary {
        source: src.to_path_buf(),
        destination: dst.to_path_buf(),
        format,
        width,
        height,
        size_bytes: data.len() as u64,
        decoder: decoder.to_string(),
    })
}

fn encode(image: &DynamicImage, format: ExportFormat, quality: u8) -> DecodeResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
        ExportFormat::Png => image.write_to(&mut buffer, ImageFormat::Png)?,
        ExportFormat::Tiff => image.write_to(&mut buffer, ImageFormat::Tiff)?,
        ExportFormat::Webp => {
            DynamicImage::ImageRgba8(image.to_rgba8()).write_to(&mut buffer, ImageFormat::WebP)?
        }
    }
    Ok(buffer.into_inner())
}
