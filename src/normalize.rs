//! Filename parsing and normalization.
//!
//! Chart packages arrive named `"<Artist> - <Title> (<Charter>).sng"`, and the
//! browser appends `" (N)"` before the extension when a name is already taken.
//! Everything here is a pure function of the file name.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ParsedFilename, SongKey};

// ============================================================================
// Regex Patterns
// ============================================================================

/// `Artist - Title (Charter)[ (N)].ext`, anchored at both ends.
/// Title is lazy so `"A - B (C) (1).sng"` yields charter `C` and counter `1`,
/// while `"A - B (Live) (C).sng"` backtracks to title `B (Live)`. The charter
/// may hold one level of nested parentheses: `"A - B (C (x)).sng"`.
static SONG_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<artist>.+?) - (?P<title>.+?) \((?P<charter>(?:[^()]|\([^()]*\))+)\)(?: \((?P<counter>\d+)\))?\.(?P<ext>[^.]+)$",
    )
    .unwrap()
});

/// Trailing download counter right before the extension: `" (3).sng"`
static COUNTER_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" \(\d+\)(?P<ext>\.[^.]+)$").unwrap());

// ============================================================================
// Parsing
// ============================================================================

/// Parse a file name into its identity, counter, and extension.
///
/// Returns `None` for anything that deviates from the grammar; no attempt is
/// made to guess at partial matches.
pub fn parse_filename(file_name: &str) -> Option<ParsedFilename> {
    let caps = SONG_FILENAME.captures(file_name)?;

    // Only digits reach here, so a failed parse is an overflow; saturate.
    let counter = caps
        .name("counter")
        .map(|m| m.as_str().parse::<u32>().unwrap_or(u32::MAX));

    Some(ParsedFilename {
        key: SongKey::new(&caps["artist"], &caps["title"], &caps["charter"]),
        counter,
        extension: caps["ext"].to_string(),
    })
}

/// Extract just the [`SongKey`], ignoring any counter.
pub fn parse_song_key(file_name: &str) -> Option<SongKey> {
    parse_filename(file_name).map(|p| p.key)
}

// ============================================================================
// Normalization
// ============================================================================

/// Strip a trailing `" (N)"` counter.
///
/// Parseable names are rebuilt from their parse so a purely numeric charter
/// (`"A - B (123).sng"`) is not mistaken for a counter. Unparseable names fall
/// back to a plain suffix strip.
pub fn normalized_name(file_name: &str) -> String {
    match parse_filename(file_name) {
        Some(parsed) => parsed.normalized_file_name(),
        None => COUNTER_SUFFIX.replace(file_name, "$ext").to_string(),
    }
}

/// Whether the name carries a download counter.
pub fn has_counter_suffix(file_name: &str) -> bool {
    match parse_filename(file_name) {
        Some(parsed) => parsed.counter.is_some(),
        None => COUNTER_SUFFIX.is_match(file_name),
    }
}

/// Case-insensitive extension check (`ext` without the dot).
pub fn has_extension(file_name: &str, ext: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(stem, e)| !stem.is_empty() && e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

// ============================================================================
// TESTS
// ============================================================================
