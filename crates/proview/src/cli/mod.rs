//! Command implementations.

pub mod config;
pub mod convert;
pub mod open;

use std::path::PathBuf;

/// Expand `~` and environment variables in a user-supplied path.
pub(crate) fn expand_path(path: &std::path::Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            tracing::debug!("Not expanding {:?}: {e}", path);
            path.to_path_buf()
        }
    }
}
