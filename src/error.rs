//! Per-item filesystem failures.
//!
//! These never abort a run; they are collected into the run report and the
//! remaining batch entries are still processed.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Failed to list batch directory {}: {source}", path.display())]
    ListBatch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to stat {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DedupError {
    /// The batch-side path the failure concerns.
    pub fn path(&self) -> &Path {
        match self {
            DedupError::ListBatch { path, .. }
            | DedupError::Stat { path, .. }
            | DedupError::Remove { path, .. }
            | DedupError::CreateDir { path, .. } => path,
            DedupError::Move { from, .. } => from,
        }
    }
}
