//! Single-asset processing - wires classification, thumbnail and metadata
//! extraction into one [`AssetRecord`].

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{Config, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{AssetMetadata, AssetRecord, Thumbnail, ThumbnailOrigin};

use super::classify::{classify, FormatFamily, FormatTag};
use super::metadata::MetadataExtractor;
use super::raster::TargetBox;
use super::thumbnail::{ladder, Strategy, ThumbnailGenerator};

/// Turns one path into one record.
#[derive(Debug, Clone)]
pub struct AssetProcessor {
    thumbnails: ThumbnailGenerator,
    limits: LimitsConfig,
}

impl AssetProcessor {
    /// Create a new processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            thumbnails: ThumbnailGenerator::new(config.thumbnail, config.limits.clone()),
            limits: config.limits.clone(),
        }
    }

    /// The thumbnail generator this processor uses.
    pub fn thumbnails(&self) -> &ThumbnailGenerator {
        &self.thumbnails
    }

    /// Process `path` with the configured thumbnail box.
    pub async fn open_asset(&self, path: &Path) -> PipelineResult<AssetRecord> {
        self.process(path, self.thumbnails.target()).await
    }

    /// Process `path` into a record with a thumbnail bounded by `target`.
    ///
    /// Classification, filesystem access and unreadable standard rasters
    /// fail. Other decoder failures, timeouts and worker panics degrade the
    /// thumbnail and metadata instead.
    pub async fn process(&self, path: &Path, target: TargetBox) -> PipelineResult<AssetRecord> {
        let tag = classify(path)?;
        self.process_classified(path, tag, target).await
    }

    /// [`process`](Self::process) for a path already classified as `tag`.
    pub async fn process_classified(
        &self,
        path: &Path,
        tag: FormatTag,
        target: TargetBox,
    ) -> PipelineResult<AssetRecord> {
        let start = Instant::now();
        tracing::debug!("Processing: {:?} as {}", path, tag);

        let fs_meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;
        if !fs_meta.is_file() {
            return Err(PipelineError::NotAFile(path.to_path_buf()));
        }

        let (thumbnail, metadata) = if fs_meta.len() > self.limits.max_file_size_bytes() {
            tracing::warn!(
                "{:?} is {} MB (limit {} MB), using header probe only",
                path,
                fs_meta.len() / (1024 * 1024),
                self.limits.max_file_size_mb
            );
            self.degraded(path, tag, target).await?
        } else {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| PipelineError::io(path, e))?;
            self.decode(path, tag, bytes, target).await?
        };

        let record = AssetRecord {
            path: absolute(path).await,
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string()),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
            size_bytes: fs_meta.len(),
            created_at: fs_meta.created().ok().map(DateTime::<Utc>::from),
            modified_at: fs_meta.modified().ok().map(DateTime::<Utc>::from),
            dimensions: metadata.dimensions,
            format: tag,
            probed_format: metadata.probed_format,
            thumbnail,
            metadata: metadata.extension,
        };

        tracing::debug!(
            "Processed {:?} in {:?} ({})",
            record.name,
            start.elapsed(),
            if record.thumbnail.is_placeholder() { "placeholder" } else { "decoded" }
        );
        Ok(record)
    }

    /// Thumbnail and metadata on a blocking worker, bounded by the decode timeout.
    async fn decode(
        &self,
        path: &Path,
        tag: FormatTag,
        bytes: Vec<u8>,
        target: TargetBox,
    ) -> PipelineResult<(Thumbnail, AssetMetadata)> {
        let generator = self.thumbnails.clone();
        let task = tokio::task::spawn_blocking(move || {
            let thumbnail = generator.generate_from_bytes(&bytes, tag, target);
            let metadata = MetadataExtractor::extract_from_bytes(&bytes, tag);
            (thumbnail, metadata)
        });

        let timeout = Duration::from_millis(self.limits.decode_timeout_ms);
        match tokio::time::timeout(timeout, task).await {
            Ok(Ok((thumbnail, metadata))) => {
                let thumbnail = encode_result(path, thumbnail)?;
                if is_unreadable(tag, &thumbnail, &metadata) {
                    return Err(PipelineError::Unreadable {
                        path: path.to_path_buf(),
                        format: tag.label(),
                    });
                }
                Ok((thumbnail, metadata))
            }
            Ok(Err(e)) => {
                tracing::error!("Decode worker failed for {:?}: {e}", path);
                self.degraded(path, tag, target).await
            }
            Err(_) => {
                tracing::warn!("Decoding {:?} timed out after {:?}", path, timeout);
                self.degraded(path, tag, target).await
            }
        }
    }

    /// Placeholder thumbnail plus a header-only probe.
    async fn degraded(
        &self,
        path: &Path,
        tag: FormatTag,
        target: TargetBox,
    ) -> PipelineResult<(Thumbnail, AssetMetadata)> {
        let thumbnail = encode_result(path, self.thumbnails.placeholder(tag, target))?;
        let probe_path = path.to_path_buf();
        let metadata = tokio::task::spawn_blocking(move || MetadataExtractor::probe_file(&probe_path))
            .await
            .unwrap_or_default();
        Ok((thumbnail, metadata))
    }
}

/// A raster format whose real decoders all failed and whose header the
/// probe could not read. Layered documents keep their placeholder.
fn is_unreadable(tag: FormatTag, thumbnail: &Thumbnail, metadata: &AssetMetadata) -> bool {
    let has_decoder = ladder(tag).iter().any(|s| *s != Strategy::Placeholder);
    has_decoder
        && tag.family() != FormatFamily::Layered
        && matches!(thumbnail.origin, ThumbnailOrigin::Placeholder { .. })
        && metadata.dimensions.is_none()
}

fn encode_result(
    path: &Path,
    thumbnail: crate::error::DecodeResult<Thumbnail>,
) -> PipelineResult<Thumbnail> {
    thumbnail.map_err(|e| PipelineError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

async fn absolute(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, PsdBuilder, TestLayer};
    use crate::types::{Dimensions, MetadataExtension};
    use tempfile::tempdir;

    fn processor() -> AssetProcessor {
        AssetProcessor::new(&Config::default())
    }

    fn processor_with_limits(limits: LimitsConfig) -> AssetProcessor {
        let config = Config {
            limits,
            ..Config::default()
        };
        AssetProcessor::new(&config)
    }

    #[tokio::test]
    async fn test_open_png() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "Photo.PNG", &fixtures::png_bytes(640, 480));

        let record = processor().open_asset(&path).await.unwrap();
        assert_eq!(record.name, "Photo.PNG");
        assert_eq!(record.extension, "png");
        assert_eq!(record.format, FormatTag::Png);
        assert!(record.size_bytes > 0);
        assert!(record.path.is_absolute());
        assert!(record.modified_at.is_some());
        assert_eq!(record.dimensions, Some(Dimensions::new(640, 480)));
        assert_eq!((record.thumbnail.width, record.thumbnail.height), (200, 150));
        assert!(!record.thumbnail.is_placeholder());
    }

    #[tokio::test]
    async fn test_open_layered_psd() {
        let dir = tempdir().unwrap();
        let bytes = PsdBuilder::new(300, 300)
            .layer(TestLayer::new("Art", (0, 0, 300, 300), [10, 200, 10, 255]))
            .build();
        let path = fixtures::write_file(dir.path(), "poster.psd", &bytes);

        let record = processor().open_asset(&path).await.unwrap();
        assert_eq!(record.dimensions, Some(Dimensions::new(300, 300)));
        assert!(matches!(record.metadata, MetadataExtension::Layered(_)));
        assert_eq!(
            record.thumbnail.origin,
            ThumbnailOrigin::Decoded {
                decoder: "layered".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_still_yields_record() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "broken.psd", b"8BPS\0\x01garbage");

        let record = processor().open_asset(&path).await.unwrap();
        assert!(record.thumbnail.is_placeholder());
        assert_eq!(record.metadata, MetadataExtension::None);
        assert_eq!(record.size_bytes, 13);
    }

    #[tokio::test]
    async fn test_unrecognized_jpeg_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "img_017.jpg", b"\xFF\xD8 corrupt");

        let err = processor().open_asset(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Unreadable { format: "JPEG", .. }));
    }

    #[tokio::test]
    async fn test_unrecognized_tiff_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "scan.tif", b"II*\0junk");

        let err = processor().open_asset(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Unreadable { format: "TIFF", .. }));
    }

    #[tokio::test]
    async fn test_readable_header_keeps_placeholder() {
        let dir = tempdir().unwrap();
        // valid header and IHDR, body cut off before any image data
        let png = fixtures::png_bytes(64, 32);
        let path = fixtures::write_file(dir.path(), "cut.png", &png[..33]);

        let record = processor().open_asset(&path).await.unwrap();
        assert!(record.thumbnail.is_placeholder());
        assert_eq!(record.dimensions, Some(Dimensions::new(64, 32)));
    }

    #[tokio::test]
    async fn test_eps_keeps_placeholder() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "logo.eps", b"%!PS-Adobe-3.0 EPSF-3.0");

        let record = processor().open_asset(&path).await.unwrap();
        assert!(record.thumbnail.is_placeholder());
        assert_eq!(record.format, FormatTag::Eps);
    }

    #[tokio::test]
    async fn test_process_classified_uses_given_tag() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "a.png", &fixtures::png_bytes(10, 10));
        let record = processor()
            .process_classified(&path, FormatTag::Png, TargetBox::new(5, 5))
            .await
            .unwrap();
        assert_eq!(record.format, FormatTag::Png);
        assert_eq!((record.thumbnail.width, record.thumbnail.height), (5, 5));
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "notes.txt", b"hello");
        let err = processor().open_asset(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = processor()
            .open_asset(&dir.path().join("gone.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let fake = dir.path().join("folder.png");
        std::fs::create_dir(&fake).unwrap();
        let err = processor().open_asset(&fake).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotAFile(_)));
    }

    #[tokio::test]
    async fn test_oversized_file_gets_probe_only() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "huge.png", &fixtures::png_bytes(320, 240));
        let processor = processor_with_limits(LimitsConfig {
            max_file_size_mb: 0,
            ..LimitsConfig::default()
        });

        let record = processor.open_asset(&path).await.unwrap();
        assert!(record.thumbnail.is_placeholder());
        assert_eq!(record.dimensions, Some(Dimensions::new(320, 240)));
        assert_eq!(record.probed_format.as_deref(), Some("png"));
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_placeholder() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "slow.png", &fixtures::png_bytes(4000, 4000));
        let processor = processor_with_limits(LimitsConfig {
            decode_timeout_ms: 0,
            ..LimitsConfig::default()
        });

        let record = processor.open_asset(&path).await.unwrap();
        assert!(record.thumbnail.is_placeholder());
        assert_eq!(record.dimensions, Some(Dimensions::new(4000, 4000)));
    }

    #[tokio::test]
    async fn test_custom_box() {
        let dir = tempdir().unwrap();
        let path = fixtures::write_file(dir.path(), "a.png", &fixtures::png_bytes(100, 400));
        let record = processor()
            .process(&path, TargetBox::new(50, 50))
            .await
            .unwrap();
        assert_eq!((record.thumbnail.width, record.thumbnail.height), (13, 50));
    }
}
