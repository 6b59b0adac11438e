//! Directory listing for batch ingestion.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::classify::{classify, FormatTag};
use crate::config::IngestConfig;
use crate::error::{PipelineError, PipelineResult};

/// Discovers ingestible files in a directory.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    config: IngestConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Classifier verdict
    pub tag: FormatTag,
    /// File size in bytes
    pub size: u64,
}

/// Result of listing one directory.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Candidates in listing order, at most `max_candidates`
    pub files: Vec<DiscoveredFile>,
    /// Matching files dropped by the candidate cap
    pub truncated: usize,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// List the ingestible files in `dir`, sorted by file name.
    ///
    /// Only the top level is listed unless `recursive` is set. Entries that
    /// fail to classify or are not in the extension allow-list are skipped.
    pub fn discover(&self, dir: &Path) -> PipelineResult<Listing> {
        let listing_error = |source| PipelineError::Listing {
            path: dir.to_path_buf(),
            source,
        };

        let meta = std::fs::metadata(dir).map_err(listing_error)?;
        if !meta.is_dir() {
            return Err(listing_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }
        // Surface permission errors on the root itself.
        std::fs::read_dir(dir).map_err(listing_error)?;

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        let mut matched = 0usize;

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {e}", dir);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(tag) = self.is_supported(entry.path()) else {
                continue;
            };

            matched += 1;
            if files.len() >= self.config.max_candidates {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(DiscoveredFile {
                path: entry.into_path(),
                tag,
                size,
            });
        }

        let truncated = matched - files.len();
        if truncated > 0 {
            tracing::warn!(
                "{:?} has {} matching files; only the first {} will be ingested",
                dir,
                matched,
                self.config.max_candidates
            );
        }

        Ok(Listing { files, truncated })
    }

    /// Classify `path` and check it against the extension allow-list.
    fn is_supported(&self, path: &Path) -> Option<FormatTag> {
        let tag = classify(path).ok()?;
        let ext = path.extension()?.to_str()?;
        self.config
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            .then_some(tag)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
