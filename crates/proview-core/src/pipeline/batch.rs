//! Directory ingestion in fixed-size batches.
//!
//! The coordinator lists a directory once, then processes the candidates
//! batch by batch. Every file of a batch runs concurrently; the batch is
//! emitted only after all of its files have settled, and the next batch does
//! not start before that, so a batch bounds the number of files in flight. A
//! file that fails is logged and listed in the batch's failures without
//! affecting its siblings.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::channel::bounded_channel;
use super::discovery::{DiscoveredFile, FileDiscovery, Listing};
use super::processor::AssetProcessor;
use super::thumbnail::ThumbnailGenerator;
use crate::config::{Config, IngestConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::AssetRecord;

/// Records produced by one batch.
#[derive(Debug, Clone)]
pub struct IngestBatch {
    /// Zero-based batch number, in listing order
    pub index: usize,
    /// Records in completion order
    pub records: Vec<AssetRecord>,
    /// Files dropped from this batch
    pub failures: Vec<FailedAsset>,
}

/// A file that produced no record.
#[derive(Debug, Clone, Serialize)]
pub struct FailedAsset {
    pub path: PathBuf,
    pub error: String,
}

/// Coordinator lifecycle, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Listing,
    Dispatching,
    Awaiting,
    Emitting,
}

/// Ingests single files and whole directories.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    processor: AssetProcessor,
    discovery: FileDiscovery,
    ingest: IngestConfig,
}

impl BatchCoordinator {
    /// Create a new coordinator with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            processor: AssetProcessor::new(config),
            discovery: FileDiscovery::new(config.ingest.clone()),
            ingest: config.ingest.clone(),
        }
    }

    /// Process one file; the same pipeline as a directory batch of one.
    pub async fn open_asset(&self, path: &Path) -> PipelineResult<AssetRecord> {
        self.processor.open_asset(path).await
    }

    /// The thumbnail generator shared by every batch.
    pub fn thumbnails(&self) -> &ThumbnailGenerator {
        self.processor.thumbnails()
    }

    /// List `dir` without processing anything.
    pub async fn list(&self, dir: &Path) -> PipelineResult<Listing> {
        let mut state = CoordinatorState::Idle;
        transition(&mut state, CoordinatorState::Listing, None);

        let discovery = self.discovery.clone();
        let root = dir.to_path_buf();
        let joined = tokio::task::spawn_blocking(move || discovery.discover(&root)).await;

        transition(&mut state, CoordinatorState::Idle, None);
        let listing = settle_listing(dir, joined)?;
        tracing::debug!(
            "Listed {} candidates in {:?} ({} over the cap)",
            listing.files.len(),
            dir,
            listing.truncated
        );
        Ok(listing)
    }

    /// Ingest `dir`, streaming one [`IngestBatch`] per settled batch.
    ///
    /// Listing happens before this returns, so an unreadable directory is
    /// reported here rather than through the stream. Dropping the receiver
    /// stops the coordinator after the batch in flight.
    pub async fn ingest_directory(&self, dir: &Path) -> PipelineResult<mpsc::Receiver<IngestBatch>> {
        let listing = self.list(dir).await?;
        Ok(self.ingest_listing(listing))
    }

    /// Stream batches for an existing listing.
    pub fn ingest_listing(&self, listing: Listing) -> mpsc::Receiver<IngestBatch> {
        let (tx, rx) = bounded_channel(&self.ingest);
        let processor = Arc::new(self.processor.clone());
        let batch_size = self.ingest.batch_size.max(1);

        tokio::spawn(async move {
            run_batches(processor, listing.files, batch_size, tx).await;
        });
        rx
    }

    /// Ingest `dir` and collect every record.
    pub async fn collect_directory(&self, dir: &Path) -> PipelineResult<Vec<AssetRecord>> {
        let mut rx = self.ingest_directory(dir).await?;
        let mut records = Vec::new();
        while let Some(batch) = rx.recv().await {
            records.extend(batch.records);
        }
        Ok(records)
    }
}

async fn run_batches(
    processor: Arc<AssetProcessor>,
    files: Vec<DiscoveredFile>,
    batch_size: usize,
    tx: mpsc::Sender<IngestBatch>,
) {
    let mut state = CoordinatorState::Idle;

    for (index, chunk) in files.chunks(batch_size).enumerate() {
        transition(&mut state, CoordinatorState::Dispatching, Some(index));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut pending: HashSet<PathBuf> = HashSet::with_capacity(chunk.len());

        for file in chunk {
            let processor = processor.clone();
            let done_tx = done_tx.clone();
            let (path, tag) = (file.path.clone(), file.tag);
            pending.insert(path.clone());

            tokio::spawn(async move {
                let target = processor.thumbnails().target();
                let result = processor.process_classified(&path, tag, target).await;
                let _ = done_tx.send((path, result));
            });
        }
        drop(done_tx);

        transition(&mut state, CoordinatorState::Awaiting, Some(index));
        let mut records = Vec::with_capacity(chunk.len());
        let mut failures = Vec::new();

        while let Some((path, result)) = done_rx.recv().await {
            pending.remove(&path);
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {e}", path);
                    failures.push(FailedAsset {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }
        // A task that panicked never reported back.
        for path in pending {
            tracing::error!("Processing task for {:?} ended without a result", path);
            failures.push(FailedAsset {
                path,
                error: "processing task panicked".to_string(),
            });
        }

        transition(&mut state, CoordinatorState::Emitting, Some(index));
        tracing::debug!(
            "Batch {index}: {} records, {} failures",
            records.len(),
            failures.len()
        );
        let batch = IngestBatch {
            index,
            records,
            failures,
        };
        if tx.send(batch).await.is_err() {
            tracing::debug!("Batch receiver dropped, stopping after batch {index}");
            break;
        }
    }

    transition(&mut state, CoordinatorState::Idle, None);
}

/// A listing worker that panicked is a failed listing, never an empty one.
fn settle_listing(
    dir: &Path,
    joined: Result<PipelineResult<Listing>, tokio::task::JoinError>,
) -> PipelineResult<Listing> {
    joined.unwrap_or_else(|e| {
        tracing::error!("Listing task failed for {:?}: {e}", dir);
        Err(PipelineError::Listing {
            path: dir.to_path_buf(),
            source: std::io::Error::other(e),
        })
    })
}

fn transition(state: &mut CoordinatorState, next: CoordinatorState, batch: Option<usize>) {
    tracing::debug!(from = ?*state, to = ?next, batch = ?batch, "Coordinator state");
    *state = next;
}
