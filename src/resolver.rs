//! Intra-batch resolution.
//!
//! Batch entries sharing a normalized name are copies of the same chart.
//! They are streamed through a [`BestTable`] in listing order; each newcomer
//! is compared with its group's current best and the loser is deleted on the
//! spot. Deletion is not staged and cannot be undone.

use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::DedupError;
use crate::events::{DecisionEvent, DecisionKind, DecisionSink};
use crate::models::BatchEntry;

/// Current best entry per normalized name.
///
/// Owned by the caller and handed to [`resolve_batch`]; a concurrent caller
/// can put it behind a `Mutex` to keep one writer per group.
#[derive(Debug, Default)]
pub struct BestTable {
    best: FxHashMap<String, BatchEntry>,
}

impl BestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct normalized names seen so far.
    pub fn group_count(&self) -> usize {
        self.best.len()
    }

    /// Winners sorted by path.
    pub fn winners(&self) -> Vec<&BatchEntry> {
        let mut winners: Vec<&BatchEntry> = self.best.values().collect();
        winners.sort_by(|a, b| a.path.cmp(&b.path));
        winners
    }
}

/// Result of one resolution pass.
#[derive(Debug, Default)]
pub struct ResolveReport {
    pub winners: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub errors: Vec<DedupError>,
}

/// Whether `challenger` should replace `best`.
///
/// Larger always wins. On equal size an unsuffixed challenger wins; a
/// suffixed one loses.
pub fn challenger_wins(best: &BatchEntry, challenger: &BatchEntry) -> bool {
    challenger.size_bytes > best.size_bytes
        || (challenger.size_bytes == best.size_bytes && !challenger.has_suffix)
}

/// Keep one entry per normalized name, deleting the rest.
///
/// `entries` should already exclude library duplicates and be in directory
/// listing order. A failed deletion is reported and the pass continues.
pub fn resolve_batch<I>(entries: I, table: &mut BestTable, sink: &dyn DecisionSink) -> ResolveReport
where
    I: IntoIterator<Item = BatchEntry>,
{
    let mut report = ResolveReport::default();

    for entry in entries {
        let loser = match table.best.entry(entry.normalized_name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                continue;
            }
            Entry::Occupied(mut slot) => {
                if challenger_wins(slot.get(), &entry) {
                    debug!(
                        "{} ({} bytes) replaces {} ({} bytes)",
                        entry.file_name,
                        entry.size_bytes,
                        slot.get().file_name,
                        slot.get().size_bytes
                    );
                    slot.insert(entry)
                } else {
                    entry
                }
            }
        };

        match remove_chart(&loser.path, DecisionKind::RemovedAsLoser, sink) {
            Ok(()) => report.removed.push(loser.path),
            Err(e) => report.errors.push(e),
        }
    }

    debug!("{} groups after resolution, {} copies removed", table.group_count(), report.removed.len());
    for winner in table.winners() {
        sink.record(DecisionEvent::new(DecisionKind::KeptAsWinner, &winner.path));
        report.winners.push(winner.path.clone());
    }

    report
}

/// Delete a batch file and report it as `kind`, or as `RemovalFailed`.
pub(crate) fn remove_chart(path: &Path, kind: DecisionKind, sink: &dyn DecisionSink) -> Result<(), DedupError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            sink.record(DecisionEvent::new(kind, path));
            Ok(())
        }
        Err(source) => {
            let err = DedupError::Remove {
                path: path.to_path_buf(),
                source,
            };
            sink.record(DecisionEvent::new(DecisionKind::RemovalFailed, path).with_detail(err.to_string()));
            Err(err)
        }
    }
}
