//! `song.ini` sidecar reading.
//!
//! Metadata is advisory: reading never fails. A missing file, an I/O error,
//! or bytes that are not UTF-8 all come back as a [`MetadataRecord`] with
//! `unreadable` set, which [`MetadataRecord::verdict`] reports as
//! [`MetadataVerdict::Inconclusive`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::models::{MetadataRecord, MetadataVerdict, SongKey, UnreadableReason};

/// Sidecar file expected inside every song folder.
pub const SIDECAR_FILE_NAME: &str = "song.ini";

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\s*(?P<name>[^\]]*?)\s*\]$").unwrap());

/// Read `<folder>/song.ini`.
pub fn read_sidecar(folder: &Path) -> MetadataRecord {
    read_song_ini(&folder.join(SIDECAR_FILE_NAME))
}

/// Read and parse a `song.ini` file.
pub fn read_song_ini(path: &Path) -> MetadataRecord {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No sidecar at {}", path.display());
            return MetadataRecord::unreadable(UnreadableReason::Missing);
        }
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            return MetadataRecord::unreadable(UnreadableReason::Io(e.to_string()));
        }
    };

    match String::from_utf8(bytes) {
        Ok(text) => parse_song_ini(&text),
        Err(_) => {
            debug!("Undecodable sidecar {}", path.display());
            MetadataRecord::unreadable(UnreadableReason::NotUtf8)
        }
    }
}

/// Parse `key = value` lines of the `[song]` section (header matched
/// case-insensitively). Lines outside that section, comments, and lines
/// without `=` are ignored. Empty values count as absent.
pub fn parse_song_ini(text: &str) -> MetadataRecord {
    let mut record = MetadataRecord::default();
    let mut in_song = false;

    for raw in text.trim_start_matches('\u{feff}').lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(caps) = SECTION_HEADER.captures(line) {
            in_song = caps["name"].eq_ignore_ascii_case("song");
            continue;
        }

        if !in_song {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        let slot = match key.trim().to_lowercase().as_str() {
            "name" => &mut record.title,
            "artist" => &mut record.artist,
            "charter" => &mut record.charter,
            _ => continue,
        };
        // First occurrence wins
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    record
}

impl MetadataRecord {
    /// Compare against a key: artist and title must be equal ignoring case,
    /// and the key's charter must be contained in the record's charter.
    pub fn verdict(&self, key: &SongKey) -> MetadataVerdict {
        if !self.is_complete() {
            return MetadataVerdict::Inconclusive;
        }

        let (Some(title), Some(artist), Some(charter)) = (&self.title, &self.artist, &self.charter) else {
            return MetadataVerdict::Inconclusive;
        };

        if key.title_matches(title) && key.artist_matches(artist) && key.charter_within(charter) {
            MetadataVerdict::Match
        } else {
            MetadataVerdict::Mismatch
        }
    }
}
