//! Moving resolved batch files into the library.
//!
//! A file that already exists at the destination slipped past duplicate
//! checking; it is never overwritten. The batch copy is deleted instead and
//! the move counted as aborted.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::DedupError;
use crate::events::{DecisionEvent, DecisionKind, DecisionSink};
use crate::pipeline::list_batch;
use crate::resolver::remove_chart;

#[derive(Debug, Default)]
pub struct MoveReport {
    pub moved: Vec<PathBuf>,
    pub aborted: Vec<PathBuf>,
    pub errors: Vec<DedupError>,
}

/// Move every `.<extension>` file in `batch_dir` into `dest_dir`, creating
/// it if needed.
pub fn move_survivors(
    batch_dir: &Path,
    dest_dir: &Path,
    extension: &str,
    sink: &dyn DecisionSink,
) -> Result<MoveReport, DedupError> {
    std::fs::create_dir_all(dest_dir).map_err(|source| DedupError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let listing = list_batch(batch_dir, extension)?;
    let mut report = MoveReport {
        errors: listing.errors,
        ..Default::default()
    };

    for entry in listing.entries {
        let dest_path = dest_dir.join(&entry.file_name);

        if dest_path.exists() {
            warn!(
                "Missed duplicate {}; not overwriting {}",
                entry.file_name,
                dest_path.display()
            );
            match remove_chart(&entry.path, DecisionKind::MoveAborted, sink) {
                Ok(()) => report.aborted.push(entry.path),
                Err(e) => report.errors.push(e),
            }
            continue;
        }

        match move_file(&entry.path, &dest_path) {
            Ok(()) => {
                sink.record(
                    DecisionEvent::new(DecisionKind::Moved, &entry.path).with_detail(dest_path.display().to_string()),
                );
                report.moved.push(dest_path);
            }
            Err(source) => report.errors.push(DedupError::Move {
                from: entry.path,
                to: dest_path,
                source,
            }),
        }
    }

    if report.aborted.is_empty() {
        if report.moved.is_empty() {
            info!("No new songs found. None have been moved.");
        } else {
            info!("All {} files moved to {}", report.moved.len(), dest_dir.display());
        }
    } else {
        warn!(
            "{} files moved, {} aborted to avoid overwriting existing files",
            report.moved.len(),
            report.aborted.len()
        );
    }

    Ok(report)
}

/// Rename, falling back to copy + delete when crossing filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !from.is_file() {
                return Err(rename_err);
            }
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
    }
}

/// Remove `dir` if it exists and is empty. Returns whether it was removed.
pub fn remove_if_empty(dir: &Path) -> Result<bool, DedupError> {
    if !dir.is_dir() {
        return Ok(false);
    }

    let mut contents = std::fs::read_dir(dir).map_err(|source| DedupError::ListBatch {
        path: dir.to_path_buf(),
        source,
    })?;
    if contents.next().is_some() {
        info!("Directory {} is not empty", dir.display());
        return Ok(false);
    }

    std::fs::remove_dir(dir).map_err(|source| DedupError::Remove {
        path: dir.to_path_buf(),
        source,
    })?;
    info!("Directory {} removed", dir.display());
    Ok(true)
}
