//! Layered document (PSD) decoding.
//!
//! - [`document`] walks the file structure and collects layer records
//! - [`composite`] decodes channel data and flattens visible layers
//!
//! Documents with drawable layers are rendered by flattening them; documents
//! without any fall back to the stored merged image.

pub mod composite;
pub mod document;

use image::DynamicImage;

use super::raster::{fit_within, TargetBox};
use crate::config::LimitsConfig;
use crate::error::{DecodeError, DecodeResult};
use crate::types::{LayerSummary, LayeredInfo};

pub use document::{ColorMode, PsdDocument, PsdHeader};

/// Decoder for layered documents.
#[derive(Debug, Clone)]
pub struct LayeredDecoder {
    limits: LimitsConfig,
}

impl LayeredDecoder {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Render the document and fit it into `target`.
    pub fn decode(&self, bytes: &[u8], target: TargetBox) -> DecodeResult<DynamicImage> {
        Ok(fit_within(self.decode_full(bytes)?, target))
    }

    /// Render the document at full resolution.
    pub fn decode_full(&self, bytes: &[u8]) -> DecodeResult<DynamicImage> {
        let doc = PsdDocument::parse(bytes)?;
        self.check_limits(&doc)?;

        let has_layers = doc.drawable_layers().next().is_some();
        let raster = if has_layers {
            tracing::trace!(layers = doc.layers.len(), "Flattening layers");
            composite::flatten_layers(&doc)?
        } else {
            composite::merged_image(&doc)?
        };
        Ok(DynamicImage::ImageRgba8(raster))
    }

    /// Layers are decoded at their own bounds, which may exceed the canvas.
    fn check_limits(&self, doc: &PsdDocument<'_>) -> DecodeResult<()> {
        let max_dim = self.limits.max_image_dimension;
        let bounds = std::iter::once((doc.header.width, doc.header.height))
            .chain(doc.drawable_layers().map(|l| (l.width(), l.height())));
        for (width, height) in bounds {
            if width > max_dim || height > max_dim {
                return Err(DecodeError::TooLarge {
                    width,
                    height,
                    max_dim,
                });
            }
        }
        Ok(())
    }
}

/// Structural summary of a layered document, without decoding pixels.
pub fn describe(bytes: &[u8]) -> DecodeResult<(PsdHeader, LayeredInfo)> {
    let doc = PsdDocument::parse(bytes)?;
    let header = doc.header;
    let info = LayeredInfo {
        channels: header.channels,
        bits_per_channel: header.depth,
        color_mode: header.color_mode.name(),
        layers: doc
            .layers
            .iter()
            .map(|layer| LayerSummary {
                name: layer.name.clone(),
                visible: !layer.hidden,
                opacity: layer.opacity,
                width: layer.width(),
                height: layer.height(),
            })
            .collect(),
    };
    Ok((header, info))
}
