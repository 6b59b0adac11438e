//! Thumbnail generation with per-format fallback ladders.
//!
//! Every format has a fixed, ordered list of strategies. The first strategy
//! that produces a raster wins; the labeled placeholder closes every ladder,
//! so a thumbnail is always produced unless PNG encoding itself fails.

use image::DynamicImage;
use std::path::Path;

use super::classify::{classify, FormatFamily, FormatTag};
use super::decode::StandardDecoder;
use super::fallback::{try_in_order, Exhausted, Resolved};
use super::layered::LayeredDecoder;
use super::placeholder;
use super::raster::{encode_png, fit_within, TargetBox};
use super::tagged::TaggedDecoder;
use crate::config::{LimitsConfig, ThumbnailConfig};
use crate::error::{DecodeError, DecodeResult, PipelineError, PipelineResult};
use crate::types::{Thumbnail, ThumbnailOrigin};

const PNG_MIME: &str = "image/png";

/// One way of producing a preview raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Generic `image` crate decoding
    Standard,
    /// PSD layer flattening / merged image
    Layered,
    /// Direct tag-table sample decoding
    Tagged,
    /// Flat-colored labeled box
    Placeholder,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Layered => "layered",
            Self::Tagged => "tagged",
            Self::Placeholder => "placeholder",
        }
    }
}

const LAYERED_LADDER: &[Strategy] = &[Strategy::Layered, Strategy::Placeholder];
const TAGGED_LADDER: &[Strategy] = &[Strategy::Standard, Strategy::Tagged, Strategy::Placeholder];
const VECTOR_LADDER: &[Strategy] = &[Strategy::Placeholder];
const STANDARD_LADDER: &[Strategy] = &[Strategy::Standard, Strategy::Placeholder];

/// Strategies tried for `tag`, in order.
pub fn ladder(tag: FormatTag) -> &'static [Strategy] {
    match tag.family() {
        FormatFamily::Layered => LAYERED_LADDER,
        FormatFamily::TaggedRaster => TAGGED_LADDER,
        FormatFamily::VectorPrint => VECTOR_LADDER,
        FormatFamily::StandardRaster => STANDARD_LADDER,
    }
}

/// Produces bounded PNG previews for any supported asset.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    target: TargetBox,
    standard: StandardDecoder,
    layered: LayeredDecoder,
    tagged: TaggedDecoder,
}

impl ThumbnailGenerator {
    /// Create a new generator with the configured default box and decoder limits.
    pub fn new(config: ThumbnailConfig, limits: LimitsConfig) -> Self {
        Self {
            target: config.into(),
            standard: StandardDecoder::new(limits.clone()),
            layered: LayeredDecoder::new(limits.clone()),
            tagged: TaggedDecoder::new(limits),
        }
    }

    /// Default bounding box.
    pub fn target(&self) -> TargetBox {
        self.target
    }

    /// Generate a thumbnail for a file on disk.
    ///
    /// Unsupported extensions are rejected before any I/O. A file that
    /// cannot be read gets the placeholder.
    pub async fn generate(&self, path: &Path, width: u32, height: u32) -> PipelineResult<Thumbnail> {
        let tag = classify(path)?;
        let target = TargetBox::new(width, height);

        let thumbnail = match tokio::fs::read(path).await {
            Ok(bytes) => {
                let generator = self.clone();
                let task = tokio::task::spawn_blocking(move || {
                    generator.generate_from_bytes(&bytes, tag, target)
                });
                match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Thumbnail task failed for {:?}: {e}", path);
                        self.placeholder(tag, target)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Cannot read {:?} for thumbnail: {e}", path);
                self.placeholder(tag, target)
            }
        };

        thumbnail.map_err(|e| PipelineError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Run the format's ladder over in-memory bytes.
    ///
    /// The only error is a failure to encode even the neutral fallback.
    pub fn generate_from_bytes(&self, bytes: &[u8], tag: FormatTag, target: TargetBox) -> DecodeResult<Thumbnail> {
        let (raster, origin) = match try_in_order(ladder(tag), |s| self.render(s, bytes, tag, target)) {
            Ok(resolved) => {
                for (strategy, err) in &resolved.failures {
                    tracing::debug!("{} thumbnail strategy {} failed: {err}", tag, strategy.name());
                }
                let origin = origin_for(resolved.strategy, tag);
                (resolved.value, origin)
            }
            Err(exhausted) => {
                tracing::warn!("{tag} thumbnail ladder exhausted: {exhausted}");
                (placeholder::labeled(tag, target), placeholder_origin(tag))
            }
        };
        self.finish(raster, origin, target)
    }

    /// Labeled placeholder for `tag`, without touching any bytes.
    pub fn placeholder(&self, tag: FormatTag, target: TargetBox) -> DecodeResult<Thumbnail> {
        self.finish(placeholder::labeled(tag, target), placeholder_origin(tag), target)
    }

    /// Decode at full resolution with the ladder's real decoders only.
    pub fn decode_full(
        &self,
        bytes: &[u8],
        tag: FormatTag,
    ) -> Result<Resolved<Strategy, DynamicImage>, Exhausted<Strategy>> {
        let decoders: Vec<Strategy> = ladder(tag)
            .iter()
            .copied()
            .filter(|s| *s != Strategy::Placeholder)
            .collect();
        try_in_order(&decoders, |strategy| match strategy {
            Strategy::Standard => self.standard.decode_full(bytes, tag),
            Strategy::Layered => self.layered.decode_full(bytes),
            Strategy::Tagged => self.tagged.decode_full(bytes),
            Strategy::Placeholder => Err(DecodeError::NoDecoder(tag.label())),
        })
    }

    fn render(&self, strategy: Strategy, bytes: &[u8], tag: FormatTag, target: TargetBox) -> DecodeResult<DynamicImage> {
        match strategy {
            Strategy::Standard => self.standard.decode(bytes, tag, target),
            Strategy::Layered => self.layered.decode(bytes, target),
            Strategy::Tagged => self.tagged.decode(bytes, target),
            Strategy::Placeholder => Ok(placeholder::labeled(tag, target)),
        }
    }

    /// Re-fit and encode; degrade to the neutral box if encoding fails.
    fn finish(&self, raster: DynamicImage, origin: ThumbnailOrigin, target: TargetBox) -> DecodeResult<Thumbnail> {
        let raster = fit_within(raster, target);
        match encode_png(&raster) {
            Ok(data) => Ok(thumbnail(data, &raster, origin)),
            Err(e) => {
                tracing::warn!("Thumbnail encoding failed, using neutral box: {e}");
                let neutral = placeholder::neutral(target);
                let data = encode_png(&neutral)?;
                Ok(thumbnail(data, &neutral, ThumbnailOrigin::Neutral))
            }
        }
    }
}

fn thumbnail(data: Vec<u8>, raster: &DynamicImage, origin: ThumbnailOrigin) -> Thumbnail {
    Thumbnail {
        data,
        width: raster.width(),
        height: raster.height(),
        mime: PNG_MIME.to_string(),
        origin,
    }
}

fn origin_for(strategy: Strategy, tag: FormatTag) -> ThumbnailOrigin {
    match strategy {
        Strategy::Placeholder => placeholder_origin(tag),
        decoder => ThumbnailOrigin::Decoded {
            decoder: decoder.name().to_string(),
        },
    }
}

fn placeholder_origin(tag: FormatTag) -> ThumbnailOrigin {
    ThumbnailOrigin::Placeholder {
        label: tag.label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, PsdBuilder, TestLayer, TiffBuilder};
    use image::GenericImageView;
    use tempfile::tempdir;

    fn generator() -> ThumbnailGenerator {
        ThumbnailGenerator::new(ThumbnailConfig::default(), LimitsConfig::default())
    }

    fn decoded_size(thumb: &Thumbnail) -> (u32, u32) {
        image::load_from_memory(&thumb.data).unwrap().dimensions()
    }

    fn decoded_by(name: &str) -> ThumbnailOrigin {
        ThumbnailOrigin::Decoded {
            decoder: name.to_string(),
        }
    }

    #[test]
    fn test_ladders() {
        assert_eq!(ladder(FormatTag::Psd), LAYERED_LADDER);
        assert_eq!(
            ladder(FormatTag::Tiff),
            &[Strategy::Standard, Strategy::Tagged, Strategy::Placeholder]
        );
        assert_eq!(ladder(FormatTag::Eps), &[Strategy::Placeholder]);
        for tag in [FormatTag::Jpeg, FormatTag::Png, FormatTag::Gif, FormatTag::WebP] {
            assert_eq!(ladder(tag), STANDARD_LADDER);
        }
        for tag in FormatTag::ALL {
            assert_eq!(ladder(tag).last(), Some(&Strategy::Placeholder));
        }
    }

    #[test]
    fn test_png_decoded_within_box() {
        let bytes = fixtures::png_bytes(800, 600);
        let thumb = generator()
            .generate_from_bytes(&bytes, FormatTag::Png, TargetBox::new(200, 200))
            .unwrap();
        assert_eq!(thumb.origin, decoded_by("standard"));
        assert_eq!((thumb.width, thumb.height), (200, 150));
        assert_eq!(decoded_size(&thumb), (200, 150));
        assert_eq!(thumb.mime, "image/png");
    }

    #[test]
    fn test_corrupt_jpeg_gets_placeholder() {
        let thumb = generator()
            .generate_from_bytes(b"\xFF\xD8garbage", FormatTag::Jpeg, TargetBox::new(120, 80))
            .unwrap();
        assert_eq!(
            thumb.origin,
            ThumbnailOrigin::Placeholder {
                label: "JPEG".to_string()
            }
        );
        assert_eq!(decoded_size(&thumb), (120, 80));
    }

    #[test]
    fn test_truncated_psd_gets_labeled_placeholder() {
        let bytes = PsdBuilder::new(300, 300).build();
        let thumb = generator()
            .generate_from_bytes(&bytes[..30], FormatTag::Psd, TargetBox::new(200, 200))
            .unwrap();
        assert!(thumb.is_placeholder());
        assert_eq!(
            thumb.origin,
            ThumbnailOrigin::Placeholder {
                label: "PSD".to_string()
            }
        );
        assert_eq!(decoded_size(&thumb), (200, 200));
    }

    #[test]
    fn test_layered_psd_decoded() {
        let bytes = PsdBuilder::new(400, 100)
            .layer(TestLayer::new("Fill", (0, 0, 100, 400), [255, 0, 0, 255]))
            .build();
        let thumb = generator()
            .generate_from_bytes(&bytes, FormatTag::Psd, TargetBox::default())
            .unwrap();
        assert_eq!(thumb.origin, decoded_by("layered"));
        assert_eq!(decoded_size(&thumb), (200, 50));
    }

    #[test]
    fn test_tiff_standard_then_placeholder() {
        let bytes = TiffBuilder::rgb(50, 50).build();
        let thumb = generator()
            .generate_from_bytes(&bytes, FormatTag::Tiff, TargetBox::default())
            .unwrap();
        assert_eq!(thumb.origin, decoded_by("standard"));

        let broken = TiffBuilder::rgb(50, 50).compression(34712).build();
        let thumb = generator()
            .generate_from_bytes(&broken, FormatTag::Tiff, TargetBox::default())
            .unwrap();
        assert!(thumb.is_placeholder());
    }

    #[test]
    fn test_tiff_falls_back_to_tagged_decoder() {
        // signed samples: rejected by the standard decoder, read by the tagged one
        let bytes = TiffBuilder::gray(400, 200).signed().fill(0).build();
        let thumb = generator()
            .generate_from_bytes(&bytes, FormatTag::Tiff, TargetBox::default())
            .unwrap();
        assert_eq!(thumb.origin, decoded_by("tagged"));
        assert_eq!(decoded_size(&thumb), (200, 100));
        let img = image::load_from_memory(&thumb.data).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(50, 50).0, [128, 128, 128, 255]);

        let resolved = generator().decode_full(&bytes, FormatTag::Tiff).unwrap();
        assert_eq!(resolved.strategy, Strategy::Tagged);
        assert_eq!(resolved.failures.len(), 1);
        assert_eq!(resolved.failures[0].0, Strategy::Standard);
    }

    #[test]
    fn test_eps_always_placeholder() {
        let thumb = generator()
            .generate_from_bytes(b"%!PS-Adobe-3.0 EPSF-3.0", FormatTag::Eps, TargetBox::new(64, 64))
            .unwrap();
        assert_eq!(
            thumb.origin,
            ThumbnailOrigin::Placeholder {
                label: "EPS".to_string()
            }
        );
    }

    #[test]
    fn test_zero_box_clamped() {
        let bytes = fixtures::png_bytes(10, 10);
        let thumb = generator()
            .generate_from_bytes(&bytes, FormatTag::Png, TargetBox::new(0, 0))
            .unwrap();
        assert_eq!(decoded_size(&thumb), (1, 1));
    }

    #[test]
    fn test_decode_full_skips_placeholder() {
        let gen = generator();
        let resolved = gen.decode_full(&fixtures::png_bytes(640, 10), FormatTag::Png).unwrap();
        assert_eq!(resolved.strategy, Strategy::Standard);
        assert_eq!(resolved.value.dimensions(), (640, 10));

        let err = gen.decode_full(b"%!PS", FormatTag::Eps).unwrap_err();
        assert!(err.failures.is_empty());
    }

    #[tokio::test]
    async fn test_generate_from_path() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "wide.png", &fixtures::png_bytes(1000, 250));
        let thumb = generator().generate(&path, 100, 100).await.unwrap();
        assert_eq!(decoded_size(&thumb), (100, 25));
    }

    #[tokio::test]
    async fn test_generate_missing_file_gets_placeholder() {
        let dir = tempdir().unwrap();
        let thumb = generator()
            .generate(&dir.path().join("gone.tif"), 50, 50)
            .await
            .unwrap();
        assert_eq!(
            thumb.origin,
            ThumbnailOrigin::Placeholder {
                label: "TIFF".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_generate_unsupported_extension() {
        let err = generator()
            .generate(Path::new("notes.txt"), 50, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }
}
