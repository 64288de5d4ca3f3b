//! End-to-end batch deduplication.
//!
//! Phases:
//! 1. list the batch directory (`.<ext>` files, sorted by name)
//! 2. set aside unparseable names, which are never deleted
//! 3. check every remaining file against the library, leaving the batch
//!    directory itself out of the search (optionally on the rayon pool;
//!    checks are read-only)
//! 4. delete library duplicates, sequentially in listing order
//! 5. resolve the survivors down to one file per normalized name

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::checker::DuplicateChecker;
use crate::error::DedupError;
use crate::events::{DecisionEvent, DecisionKind, DecisionSink};
use crate::models::{BatchEntry, DuplicateVerdict, VerificationRules};
use crate::normalize::{has_counter_suffix, has_extension, normalized_name, parse_song_key};
use crate::progress::PhaseProgress;
use crate::resolver::{remove_chart, resolve_batch, BestTable};

pub const DEFAULT_EXTENSION: &str = "sng";

#[derive(Debug, Clone)]
pub struct DedupOptions {
    /// Chart file extension, without the dot
    pub extension: String,
    /// Check batch files on the global rayon pool
    pub parallel: bool,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            parallel: false,
        }
    }
}

/// Batch directory contents. Per-file stat failures do not stop the listing.
#[derive(Debug, Default)]
pub struct BatchListing {
    pub entries: Vec<BatchEntry>,
    pub errors: Vec<DedupError>,
}

#[derive(Debug, Default)]
pub struct DedupReport {
    pub scanned: usize,
    pub unparseable: Vec<PathBuf>,
    /// Removed batch files with the evidence that condemned them
    pub library_duplicates: Vec<(PathBuf, DuplicateVerdict)>,
    pub winners: Vec<PathBuf>,
    pub losers: Vec<PathBuf>,
    pub errors: Vec<DedupError>,
    pub elapsed: Duration,
}

/// List chart files directly inside `batch_dir`, sorted by file name.
pub fn list_batch(batch_dir: &Path, extension: &str) -> Result<BatchListing, DedupError> {
    let read_dir = std::fs::read_dir(batch_dir).map_err(|source| DedupError::ListBatch {
        path: batch_dir.to_path_buf(),
        source,
    })?;

    let mut listing = BatchListing::default();
    for item in read_dir {
        let dir_entry = match item {
            Ok(dir_entry) => dir_entry,
            Err(source) => {
                listing.errors.push(DedupError::ListBatch {
                    path: batch_dir.to_path_buf(),
                    source,
                });
                continue;
            }
        };

        let path = dir_entry.path();
        let Some(file_name) = dir_entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 file name {}", path.display());
            continue;
        };
        if !has_extension(&file_name, extension) {
            continue;
        }

        let metadata = match dir_entry.metadata() {
            Ok(metadata) => metadata,
            Err(source) => {
                listing.errors.push(DedupError::Stat { path, source });
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        listing.entries.push(BatchEntry {
            normalized_name: normalized_name(&file_name),
            has_suffix: has_counter_suffix(&file_name),
            size_bytes: metadata.len(),
            file_name,
            path,
        });
    }

    listing.entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(listing)
}

/// Deduplicate `batch_dir` against `roots`, then within itself.
///
/// Only a failure to list the batch directory aborts the run; every other
/// filesystem failure is collected in [`DedupReport::errors`].
pub fn run_dedup(
    batch_dir: &Path,
    roots: &[PathBuf],
    rules: &VerificationRules,
    options: &DedupOptions,
    sink: &dyn DecisionSink,
) -> Result<DedupReport, DedupError> {
    let start = Instant::now();

    let listing = list_batch(batch_dir, &options.extension)?;
    let mut report = DedupReport {
        scanned: listing.entries.len(),
        errors: listing.errors,
        ..Default::default()
    };

    if listing.entries.is_empty() {
        info!("No .{} files to check in {}", options.extension, batch_dir.display());
    }

    let (parseable, unparseable): (Vec<BatchEntry>, Vec<BatchEntry>) = listing
        .entries
        .into_iter()
        .partition(|e| parse_song_key(&e.file_name).is_some());

    for entry in unparseable {
        sink.record(
            DecisionEvent::new(DecisionKind::UnparseableKept, &entry.path)
                .with_detail("name is not '<Artist> - <Title> (<Charter>)'"),
        );
        report.unparseable.push(entry.path);
    }

    let verdicts = check_entries(batch_dir, &parseable, roots, rules, options.parallel, sink);

    let mut survivors = Vec::with_capacity(parseable.len());
    for (entry, verdict) in parseable.into_iter().zip(verdicts) {
        if !verdict.is_duplicate() {
            survivors.push(entry);
            continue;
        }
        match remove_chart(&entry.path, DecisionKind::DuplicateRemoved, sink) {
            Ok(()) => report.library_duplicates.push((entry.path, verdict)),
            Err(e) => report.errors.push(e),
        }
    }

    let resolved = resolve_batch(survivors, &mut BestTable::new(), sink);
    report.winners = resolved.winners;
    report.losers = resolved.removed;
    report.errors.extend(resolved.errors);

    info!(
        "Duplicate removal complete: {} already in library, {} batch copies removed, {} kept",
        report.library_duplicates.len(),
        report.losers.len(),
        report.winners.len()
    );

    report.elapsed = start.elapsed();
    Ok(report)
}

fn check_entries(
    batch_dir: &Path,
    entries: &[BatchEntry],
    roots: &[PathBuf],
    rules: &VerificationRules,
    parallel: bool,
    sink: &dyn DecisionSink,
) -> Vec<DuplicateVerdict> {
    let checker = DuplicateChecker::new(roots, rules, sink).with_excluded_dir(batch_dir);
    let progress = PhaseProgress::new("check", entries.len() as u64, "Checking library");

    let check_one = |entry: &BatchEntry| {
        let verdict = checker.check(&entry.path);
        progress.tick();
        verdict
    };

    let verdicts: Vec<DuplicateVerdict> = if parallel {
        entries.par_iter().map(&check_one).collect()
    } else {
        entries.iter().map(&check_one).collect()
    };

    progress.finish(format!("Checked {} files", entries.len()));
    verdicts
}
