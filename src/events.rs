//! Decision events.
//!
//! Every keep/remove decision is reported to a [`DecisionSink`] handed to the
//! checker, resolver, and pipeline. The binary uses [`TracingSink`]; tests
//! and embedding callers can collect events with [`MemorySink`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    /// Batch file already exists in the library
    DuplicateFound,
    /// Library duplicate deleted from the batch
    DuplicateRemoved,
    /// Best copy of its group, kept
    KeptAsWinner,
    /// Lost its group to a larger (or unsuffixed) copy, deleted
    RemovedAsLoser,
    /// Name outside the naming grammar, left alone
    UnparseableKept,
    /// Moved into the destination library folder
    Moved,
    /// Destination already had the file; batch copy deleted instead
    MoveAborted,
    RemovalFailed,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::DuplicateFound => "duplicate_found",
            DecisionKind::DuplicateRemoved => "duplicate_removed",
            DecisionKind::KeptAsWinner => "kept_as_winner",
            DecisionKind::RemovedAsLoser => "removed_as_loser",
            DecisionKind::UnparseableKept => "unparseable_kept",
            DecisionKind::Moved => "moved",
            DecisionKind::MoveAborted => "move_aborted",
            DecisionKind::RemovalFailed => "removal_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    pub kind: DecisionKind,
    pub path: PathBuf,
    pub detail: Option<String>,
}

impl DecisionEvent {
    pub fn new(kind: DecisionKind, path: &Path) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Receives one event per decision. Must be shareable across rayon workers.
pub trait DecisionSink: Send + Sync {
    fn record(&self, event: DecisionEvent);
}

/// Emits decisions as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn record(&self, event: DecisionEvent) {
        let kind = event.kind.as_str();
        let path = event.path.display();
        let detail = event.detail.as_deref().unwrap_or("");
        match event.kind {
            DecisionKind::RemovalFailed | DecisionKind::MoveAborted | DecisionKind::UnparseableKept => {
                warn!(kind, path = %path, "{}", detail)
            }
            _ => info!(kind, path = %path, "{}", detail),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DecisionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Kinds recorded for `path`, in order.
    pub fn kinds_for(&self, path: &Path) -> Vec<DecisionKind> {
        self.events()
            .into_iter()
            .filter(|e| e.path == path)
            .map(|e| e.kind)
            .collect()
    }

    pub fn count(&self, kind: DecisionKind) -> usize {
        self.events().iter().filter(|e| e.kind == kind).count()
    }
}

impl DecisionSink for MemorySink {
    fn record(&self, event: DecisionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
