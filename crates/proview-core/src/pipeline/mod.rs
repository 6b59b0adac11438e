//! Asset ingestion pipeline components.
//!
//! This module contains all the stages of the ingestion pipeline:
//! - **classify**: Extension-based format tagging
//! - **decode**: Standard raster decoding via the `image` crate
//! - **layered**: PSD parsing and layer flattening
//! - **tagged**: TIFF tag directory and sample decoding
//! - **thumbnail**: Per-format fallback ladders producing PNG previews
//! - **metadata**: Header probe, EXIF, layer and tag extraction
//! - **discovery**: Directory listing
//! - **processor**: One path to one record
//! - **batch**: Batched directory ingestion
//! - **channel**: Bounded channel for streaming batches

pub mod batch;
pub mod channel;
pub mod classify;
pub mod decode;
pub mod discovery;
pub mod fallback;
pub mod layered;
pub mod metadata;
pub mod placeholder;
pub mod processor;
pub mod raster;
pub mod tagged;
pub mod thumbnail;

// Re-exports for convenient access
pub use batch::{BatchCoordinator, CoordinatorState, FailedAsset, IngestBatch};
pub use classify::{classify, FormatFamily, FormatTag};
pub use decode::StandardDecoder;
pub use discovery::{DiscoveredFile, FileDiscovery, Listing};
pub use fallback::{try_in_order, Exhausted, Resolved};
pub use layered::LayeredDecoder;
pub use metadata::MetadataExtractor;
pub use processor::AssetProcessor;
pub use raster::{fit_within, TargetBox};
pub use tagged::{TagDirectory, TaggedDecoder};
pub use thumbnail::{Strategy, ThumbnailGenerator};
