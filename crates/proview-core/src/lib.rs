//! ProView Core - asset ingestion pipeline for the ProView viewer.
//!
//! Every supported file (standard rasters, layered PSD documents, tagged
//! TIFF scans, EPS artwork) becomes an immutable [`AssetRecord`] holding a
//! bounded PNG thumbnail and format-specific metadata.
//!
//! # Architecture
//!
//! ```text
//! Path → Classify → Decode ladder → Thumbnail ─┐
//!                 → Metadata extraction ───────┴→ AssetRecord
//! Directory → List (≤200) → Batches of 50 → Stream of IngestBatch
//! ```
//!
//! Decoder failures never escape: every file that can be read yields a
//! record, with a labeled placeholder when no decoder succeeds.
//!
//! # Usage
//!
//! ```rust,ignore
//! use proview_core::{Config, ProView};
//!
//! #[tokio::main]
//! async fn main() -> proview_core::Result<()> {
//!     let proview = ProView::new(Config::load()?);
//!
//!     let record = proview.open_asset("./poster.psd".as_ref()).await?;
//!     println!("{} is {:?}", record.name, record.dimensions);
//!
//!     let mut batches = proview.ingest_directory("./shoot".as_ref()).await?;
//!     while let Some(batch) = batches.recv().await {
//!         println!("batch {}: {} records", batch.index, batch.records.len());
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, DecodeError, PipelineError, PipelineResult, ProviewError, Result};
pub use export::{ExportFormat, ExportOptions, ExportSummary, Rotation};
pub use output::{OutputFormat, RecordWriter};
pub use pipeline::{
    classify, BatchCoordinator, FailedAsset, FormatFamily, FormatTag, IngestBatch, TargetBox,
};
pub use types::{
    AssetRecord, Dimensions, ExifData, IngestStats, LayeredInfo, MetadataExtension, TaggedInfo,
    Thumbnail, ThumbnailOrigin,
};

use std::path::Path;
use tokio::sync::mpsc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ProView pipeline - the main entry point for ingestion and export.
///
/// Holds the injected configuration; there is no process-wide state.
#[derive(Debug, Clone)]
pub struct ProView {
    config: Config,
    coordinator: BatchCoordinator,
}

impl ProView {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing ProView v{}", VERSION);
        let coordinator = BatchCoordinator::new(&config);
        Self { config, coordinator }
    }

    /// Create a pipeline from the config file, or defaults when absent.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn coordinator(&self) -> &BatchCoordinator {
        &self.coordinator
    }

    /// Ingest one file.
    pub async fn open_asset(&self, path: &Path) -> PipelineResult<AssetRecord> {
        self.coordinator.open_asset(path).await
    }

    /// Ingest a directory, one [`IngestBatch`] at a time.
    pub async fn ingest_directory(&self, dir: &Path) -> PipelineResult<mpsc::Receiver<IngestBatch>> {
        self.coordinator.ingest_directory(dir).await
    }

    /// Re-encode `src` into `dst`.
    pub async fn convert(
        &self,
        src: &Path,
        dst: &Path,
        options: &ExportOptions,
    ) -> PipelineResult<ExportSummary> {
        export::convert(self.coordinator.thumbnails(), src, dst, options).await
    }
}
