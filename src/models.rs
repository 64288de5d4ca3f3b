//! Core data models for chart deduplication.
//!
//! This module contains the struct definitions, type aliases, and enums
//! shared by the parser, scanner, checker, and resolver.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ============================================================================
// Type Aliases
// ============================================================================

/// Charter name (exactly as it appears in a filename) to its verification hint.
pub type VerificationRules = FxHashMap<String, VerificationRule>;

// ============================================================================
// Song Identity
// ============================================================================

/// Identity parsed from `"<Artist> - <Title> (<Charter>).<ext>"`.
///
/// Fields keep their original casing; comparisons go through the
/// `*_matches` helpers which are case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SongKey {
    pub artist: String,
    pub title: String,
    pub charter: String,
}

impl SongKey {
    pub fn new(artist: impl Into<String>, title: impl Into<String>, charter: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            charter: charter.into(),
        }
    }

    /// `"<Artist> - <Title>"`, the stem library folders are named after.
    pub fn folder_stem(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// Canonical file name for this key with the given extension (no leading dot).
    pub fn display_file_name(&self, extension: &str) -> String {
        format!("{} - {} ({}).{}", self.artist, self.title, self.charter, extension)
    }

    pub fn artist_matches(&self, other: &str) -> bool {
        self.artist.to_lowercase() == other.to_lowercase()
    }

    pub fn title_matches(&self, other: &str) -> bool {
        self.title.to_lowercase() == other.to_lowercase()
    }

    /// Our charter is contained in `other`; metadata charters often carry
    /// extra decoration ("C, D & E", "<color=#f00>C</color>").
    pub fn charter_within(&self, other: &str) -> bool {
        other.to_lowercase().contains(&self.charter.to_lowercase())
    }
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.artist, self.title, self.charter)
    }
}

/// Full parse of a batch filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFilename {
    pub key: SongKey,
    /// Browser download counter, e.g. `2` for `"... (C) (2).sng"`
    pub counter: Option<u32>,
    /// Extension without the leading dot
    pub extension: String,
}

impl ParsedFilename {
    /// File name with the counter dropped.
    pub fn normalized_file_name(&self) -> String {
        self.key.display_file_name(&self.extension)
    }
}

// ============================================================================
// Sidecar Metadata
// ============================================================================

/// Why a sidecar could not be read at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnreadableReason {
    Missing,
    Io(String),
    NotUtf8,
}

impl fmt::Display for UnreadableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnreadableReason::Missing => write!(f, "missing"),
            UnreadableReason::Io(msg) => write!(f, "i/o error: {}", msg),
            UnreadableReason::NotUtf8 => write!(f, "not valid UTF-8"),
        }
    }
}

/// Fields pulled out of a `song.ini` `[song]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub charter: Option<String>,
    /// Set when the file itself could not be read; all fields are then `None`.
    pub unreadable: Option<UnreadableReason>,
}

impl MetadataRecord {
    pub fn unreadable(reason: UnreadableReason) -> Self {
        Self {
            unreadable: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unreadable.is_none()
            && self.title.is_some()
            && self.artist.is_some()
            && self.charter.is_some()
    }
}

/// Outcome of comparing a metadata record against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataVerdict {
    Match,
    Mismatch,
    /// Missing fields or unreadable file; hand off to the fallback verifier
    Inconclusive,
}

// ============================================================================
// Verification Rules
// ============================================================================

/// Per-charter hint: a substring expected somewhere in the path of folders
/// holding that charter's songs (e.g. `"Charters/Harmonix"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct VerificationRule {
    #[serde(default)]
    pub parent_dir_substring: String,
}

impl VerificationRule {
    pub fn new(hint: impl Into<String>) -> Self {
        Self {
            parent_dir_substring: hint.into(),
        }
    }
}

/// Which fallback heuristic confirmed a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackEvidence {
    /// The charter's configured hint occurs in the folder's absolute path
    PathHint(String),
    /// The charter name occurs literally in the folder name
    CharterInFolderName,
}

// ============================================================================
// Library Candidates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// A file whose name equals the key's display file name
    ExactFile,
    /// A folder whose name contains `"<Artist> - <Title>"`
    Folder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: CandidateKind,
    /// Directory the candidate was found in
    pub containing_dir: PathBuf,
}

impl Candidate {
    pub fn exact_file(path: PathBuf, containing_dir: &Path) -> Self {
        Self {
            path,
            kind: CandidateKind::ExactFile,
            containing_dir: containing_dir.to_path_buf(),
        }
    }

    pub fn folder(path: PathBuf, containing_dir: &Path) -> Self {
        Self {
            path,
            kind: CandidateKind::Folder,
            containing_dir: containing_dir.to_path_buf(),
        }
    }
}

/// Evidence that a batch file already exists in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateVerdict {
    ExactFile(PathBuf),
    Metadata(PathBuf),
    Fallback(PathBuf, FallbackEvidence),
    NotDuplicate,
    /// Filename does not follow the naming grammar
    Unparseable,
}

impl DuplicateVerdict {
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            DuplicateVerdict::ExactFile(_) | DuplicateVerdict::Metadata(_) | DuplicateVerdict::Fallback(..)
        )
    }

    /// Library path that confirmed the duplicate.
    pub fn matched_path(&self) -> Option<&Path> {
        match self {
            DuplicateVerdict::ExactFile(p)
            | DuplicateVerdict::Metadata(p)
            | DuplicateVerdict::Fallback(p, _) => Some(p),
            DuplicateVerdict::NotDuplicate | DuplicateVerdict::Unparseable => None,
        }
    }
}

impl fmt::Display for DuplicateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateVerdict::ExactFile(p) => write!(f, "exact file {}", p.display()),
            DuplicateVerdict::Metadata(p) => write!(f, "song.ini match in {}", p.display()),
            DuplicateVerdict::Fallback(p, FallbackEvidence::PathHint(hint)) => {
                write!(f, "path hint '{}' in {}", hint, p.display())
            }
            DuplicateVerdict::Fallback(p, FallbackEvidence::CharterInFolderName) => {
                write!(f, "charter in folder name {}", p.display())
            }
            DuplicateVerdict::NotDuplicate => write!(f, "not a duplicate"),
            DuplicateVerdict::Unparseable => write!(f, "unparseable filename"),
        }
    }
}

// ============================================================================
// Batch Models
// ============================================================================

/// One chart file in the download batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub file_name: String,
    /// File name with any trailing ` (N)` counter removed
    pub normalized_name: String,
    pub size_bytes: u64,
    pub has_suffix: bool,
}
