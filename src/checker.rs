//! Library duplicate detection.
//!
//! Evidence is tried strongest first and the first confirmation wins:
//! 1. a file with the exact canonical name anywhere under a root
//! 2. a name-similar folder whose `song.ini` matches artist, title, and charter
//! 3. a name-similar folder with inconclusive metadata that passes the
//!    charter fallback heuristics
//!
//! Folder-name similarity alone never counts.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::events::{DecisionEvent, DecisionKind, DecisionSink, TracingSink};
use crate::metadata::read_sidecar;
use crate::models::{CandidateKind, DuplicateVerdict, MetadataVerdict, VerificationRules};
use crate::normalize::parse_filename;
use crate::scanner::scan_library;
use crate::verify::fallback_verify;

pub struct DuplicateChecker<'a> {
    roots: &'a [PathBuf],
    rules: &'a VerificationRules,
    sink: &'a dyn DecisionSink,
    excluded_dir: Option<PathBuf>,
}

impl<'a> DuplicateChecker<'a> {
    pub fn new(roots: &'a [PathBuf], rules: &'a VerificationRules, sink: &'a dyn DecisionSink) -> Self {
        Self {
            roots,
            rules,
            sink,
            excluded_dir: None,
        }
    }

    /// Ignore every candidate under `dir`. The pipeline passes the batch
    /// directory so batch files never condemn each other as library copies;
    /// that is the resolver's job.
    pub fn with_excluded_dir(mut self, dir: &Path) -> Self {
        self.excluded_dir = Some(resolved(dir));
        self
    }

    /// Decide whether `batch_file` already exists in the library.
    ///
    /// The search uses the counter-free name, so `"X (1).sng"` looks for
    /// `"X.sng"`. The batch file itself is never a candidate, even when the
    /// batch directory lives under one of the roots. Read-only.
    pub fn check(&self, batch_file: &Path) -> DuplicateVerdict {
        let Some(parsed) = batch_file
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_filename)
        else {
            debug!("Unparseable file name {}", batch_file.display());
            return DuplicateVerdict::Unparseable;
        };

        let own_path = resolved(batch_file);

        for candidate in scan_library(self.roots, &parsed.key, &parsed.extension) {
            let candidate_path = resolved(&candidate.path);
            if candidate_path == own_path
                || self.excluded_dir.as_ref().is_some_and(|dir| candidate_path.starts_with(dir))
            {
                continue;
            }

            let verdict = match candidate.kind {
                CandidateKind::ExactFile => Some(DuplicateVerdict::ExactFile(candidate.path)),
                CandidateKind::Folder => match read_sidecar(&candidate.path).verdict(&parsed.key) {
                    MetadataVerdict::Match => Some(DuplicateVerdict::Metadata(candidate.path)),
                    MetadataVerdict::Mismatch => {
                        debug!("song.ini in {} describes another chart", candidate.path.display());
                        None
                    }
                    MetadataVerdict::Inconclusive => fallback_verify(&parsed.key, &candidate.path, self.rules)
                        .map(|evidence| DuplicateVerdict::Fallback(candidate.path, evidence)),
                },
            };

            if let Some(verdict) = verdict {
                self.sink.record(
                    DecisionEvent::new(DecisionKind::DuplicateFound, batch_file).with_detail(verdict.to_string()),
                );
                return verdict;
            }
        }

        DuplicateVerdict::NotDuplicate
    }

    pub fn is_duplicate(&self, batch_file: &Path) -> bool {
        self.check(batch_file).is_duplicate()
    }
}

/// One-shot form: does `batch_file` already exist under `roots`?
pub fn is_duplicate(batch_file: &Path, roots: &[PathBuf], rules: &VerificationRules) -> bool {
    DuplicateChecker::new(roots, rules, &TracingSink).is_duplicate(batch_file)
}

fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::metadata::SIDECAR_FILE_NAME;
    use crate::models::{FallbackEvidence, VerificationRule};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        library: TempDir,
        batch: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                library: TempDir::new().unwrap(),
                batch: TempDir::new().unwrap(),
            }
        }

        fn roots(&self) -> Vec<PathBuf> {
            vec![self.library.path().to_path_buf()]
        }

        fn library_file(&self, rel: &str) -> PathBuf {
            let path = self.library.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"chart").unwrap();
            path
        }

        fn library_folder(&self, rel: &str, ini: Option<&[u8]>) -> PathBuf {
            let path = self.library.path().join(rel);
            fs::create_dir_all(&path).unwrap();
            if let Some(ini) = ini {
                fs::write(path.join(SIDECAR_FILE_NAME), ini).unwrap();
            }
            path
        }

        fn batch_file(&self, name: &str) -> PathBuf {
            let path = self.batch.path().join(name);
            fs::write(&path, b"chart").unwrap();
            path
        }
    }

    fn no_rules() -> VerificationRules {
        VerificationRules::default()
    }

    #[test]
    fn test_exact_file_is_duplicate() {
        let fx = Fixture::new();
        let existing = fx.library_file("Existing Playlist/A - B (C).sng");
        let batch = fx.batch_file("A - B (C).sng");

        let sink = MemorySink::new();
        let roots = fx.roots();
        let rules = no_rules();
        let checker = DuplicateChecker::new(&roots, &rules, &sink);
        assert_eq!(checker.check(&batch), DuplicateVerdict::ExactFile(existing));
        assert_eq!(sink.kinds_for(&batch), vec![DecisionKind::DuplicateFound]);
    }

    #[test]
    fn test_counter_suffix_searches_base_name() {
        let fx = Fixture::new();
        fx.library_file("A - B (C).sng");
        let batch = fx.batch_file("A - B (C) (2).sng");
        assert!(is_duplicate(&batch, &fx.roots(), &no_rules()));
    }

    #[test]
    fn test_unparseable_is_never_duplicate() {
        let fx = Fixture::new();
        fx.library_file("TestArtist - TestSong 4(TestCharter).sng");
        let batch = fx.batch_file("TestArtist - TestSong 4(TestCharter).sng");

        let sink = MemorySink::new();
        let roots = fx.roots();
        let rules = no_rules();
        let checker = DuplicateChecker::new(&roots, &rules, &sink);
        assert_eq!(checker.check(&batch), DuplicateVerdict::Unparseable);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_metadata_match() {
        let fx = Fixture::new();
        let folder = fx.library_folder(
            "Chorus/a - b [remastered]",
            Some(b"[Song]\nname = B\nartist = A\ncharter = C and friends\n"),
        );
        let batch = fx.batch_file("A - B (C).sng");

        let roots = fx.roots();
        let rules = no_rules();
        let sink = MemorySink::new();
        let checker = DuplicateChecker::new(&roots, &rules, &sink);
        assert_eq!(checker.check(&batch), DuplicateVerdict::Metadata(folder));
    }

    #[test]
    fn test_metadata_mismatch_does_not_fall_back() {
        let fx = Fixture::new();
        // Folder name carries the charter, but the readable ini says otherwise
        fx.library_folder(
            "A - B (C)",
            Some(b"[song]\nname = B\nartist = A\ncharter = Someone Else\n"),
        );
        let batch = fx.batch_file("A - B (C).sng");
        assert!(!is_duplicate(&batch, &fx.roots(), &no_rules()));
    }

    #[test]
    fn test_folder_similarity_alone_is_not_enough() {
        let fx = Fixture::new();
        fx.library_folder("A - B", None);
        let batch = fx.batch_file("A - B (C).sng");
        assert!(!is_duplicate(&batch, &fx.roots(), &no_rules()));
    }

    #[test]
    fn test_fallback_path_hint_on_unreadable_metadata() {
        let fx = Fixture::new();
        let folder = fx.library_folder("Charters/C/A - B", Some(b"[song]\nname = B\xff\xfe\n"));
        let batch = fx.batch_file("A - B (C).sng");

        let mut rules = no_rules();
        rules.insert("C".to_string(), VerificationRule::new("Charters/C"));
        let roots = fx.roots();
        let sink = MemorySink::new();
        let checker = DuplicateChecker::new(&roots, &rules, &sink);
        assert_eq!(
            checker.check(&batch),
            DuplicateVerdict::Fallback(folder, FallbackEvidence::PathHint("Charters/C".to_string()))
        );
    }

    #[test]
    fn test_fallback_charter_in_folder_name_on_incomplete_metadata() {
        let fx = Fixture::new();
        let folder = fx.library_folder("A - B (C)", Some(b"[song]\nname = B\n"));
        let batch = fx.batch_file("A - B (C).sng");

        let roots = fx.roots();
        let rules = no_rules();
        let sink = MemorySink::new();
        let checker = DuplicateChecker::new(&roots, &rules, &sink);
        assert_eq!(
            checker.check(&batch),
            DuplicateVerdict::Fallback(folder, FallbackEvidence::CharterInFolderName)
        );
    }

    #[test]
    fn test_exact_file_wins_over_mismatching_folder() {
        let fx = Fixture::new();
        fx.library_folder(
            "A - B",
            Some(b"[song]\nname = Other\nartist = A\ncharter = C\n"),
        );
        let exact = fx.library_file("Zeta/A - B (C).sng");
        let batch = fx.batch_file("A - B (C).sng");

        let roots = fx.roots();
        let rules = no_rules();
        let sink = MemorySink::new();
        let checker = DuplicateChecker::new(&roots, &rules, &sink);
        assert_eq!(checker.check(&batch), DuplicateVerdict::ExactFile(exact));
    }

    #[test]
    fn test_file_is_not_duplicate_of_itself() {
        let library = TempDir::new().unwrap();
        let batch_dir = library.path().join("Downloads");
        fs::create_dir_all(&batch_dir).unwrap();
        let file = batch_dir.join("A - B (C).sng");
        fs::write(&file, b"chart").unwrap();

        let roots = vec![library.path().to_path_buf()];
        assert!(!is_duplicate(&file, &roots, &no_rules()));

        // The suffixed copy, though, is a duplicate of the unsuffixed one
        let copy = batch_dir.join("A - B (C) (1).sng");
        fs::write(&copy, b"chart").unwrap();
        assert!(is_duplicate(&copy, &roots, &no_rules()));
        assert!(!is_duplicate(&file, &roots, &no_rules()));
    }

    #[test]
    fn test_excluded_dir_hides_batch_siblings() {
        let library = TempDir::new().unwrap();
        let batch_dir = library.path().join("Downloads");
        fs::create_dir_all(&batch_dir).unwrap();
        fs::write(batch_dir.join("A - B (C).sng"), b"small").unwrap();
        let copy = batch_dir.join("A - B (C) (1).sng");
        fs::write(&copy, b"larger chart").unwrap();

        let roots = vec![library.path().to_path_buf()];
        let rules = no_rules();
        let sink = MemorySink::new();
        let checker = DuplicateChecker::new(&roots, &rules, &sink).with_excluded_dir(&batch_dir);
        assert_eq!(checker.check(&copy), DuplicateVerdict::NotDuplicate);
        assert!(sink.events().is_empty());

        // The rest of the root is still searched
        let existing = library.path().join("Songs/A - B (C).sng");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, b"chart").unwrap();
        assert_eq!(checker.check(&copy), DuplicateVerdict::ExactFile(existing));
    }

    #[test]
    fn test_case_insensitive_key_against_metadata() {
        let fx = Fixture::new();
        fx.library_folder(
            "the band - the song",
            Some(b"[SONG]\nName = THE SONG\nArtist = THE BAND\nCharter = dude\n"),
        );
        let batch = fx.batch_file("The Band - The Song (Dude).sng");
        assert!(is_duplicate(&batch, &fx.roots(), &no_rules()));
    }

    #[test]
    fn test_empty_library() {
        let fx = Fixture::new();
        let batch = fx.batch_file("A - B (C).sng");
        assert!(!is_duplicate(&batch, &fx.roots(), &no_rules()));
        assert!(!is_duplicate(&batch, &[], &no_rules()));
    }
}
