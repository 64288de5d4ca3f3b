//! Heuristic confirmation for folders whose `song.ini` was inconclusive.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::{FallbackEvidence, SongKey, VerificationRules};

/// Try the charter heuristics in order:
/// 1. the charter's configured hint substring occurs in the folder's absolute path
/// 2. the charter name occurs literally in the folder's own name
///
/// `None` means the folder is simply not confirmed.
pub fn fallback_verify(key: &SongKey, folder: &Path, rules: &VerificationRules) -> Option<FallbackEvidence> {
    if let Some(rule) = rules.get(&key.charter) {
        let hint = rule.parent_dir_substring.as_str();
        if !hint.is_empty() && absolute_path(folder).to_string_lossy().contains(hint) {
            debug!("Charter hint '{}' found in {}", hint, folder.display());
            return Some(FallbackEvidence::PathHint(hint.to_string()));
        }
    }

    let folder_name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if folder_name.contains(&key.charter) {
        debug!("Charter '{}' named in folder {}", key.charter, folder.display());
        return Some(FallbackEvidence::CharterInFolderName);
    }

    warn!(
        "No charter verification for '{}' in {}; not counting it as a duplicate",
        key,
        folder.display()
    );
    None
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationRule;

    fn rules(charter: &str, hint: &str) -> VerificationRules {
        let mut rules = VerificationRules::default();
        rules.insert(charter.to_string(), VerificationRule::new(hint));
        rules
    }

    #[test]
    fn test_path_hint_confirms() {
        let key = SongKey::new("A", "B", "C");
        let folder = Path::new("/library/Charters/C/A - B");
        assert_eq!(
            fallback_verify(&key, folder, &rules("C", "Charters/C")),
            Some(FallbackEvidence::PathHint("Charters/C".to_string()))
        );
    }

    #[test]
    fn test_hint_is_keyed_by_exact_charter() {
        let key = SongKey::new("A", "B", "c");
        let folder = Path::new("/library/Charters/C/A - B");
        assert_eq!(fallback_verify(&key, folder, &rules("C", "Charters/C")), None);
    }

    #[test]
    fn test_empty_hint_is_ignored() {
        let key = SongKey::new("A", "B", "Zed");
        let folder = Path::new("/library/A - B");
        assert_eq!(fallback_verify(&key, folder, &rules("Zed", "")), None);
    }

    #[test]
    fn test_charter_in_folder_name() {
        let key = SongKey::new("A", "B", "Zed");
        let folder = Path::new("/library/A - B (Zed)");
        assert_eq!(
            fallback_verify(&key, folder, &VerificationRules::default()),
            Some(FallbackEvidence::CharterInFolderName)
        );
    }

    #[test]
    fn test_charter_in_parent_only_is_not_enough() {
        let key = SongKey::new("A", "B", "Zed");
        let folder = Path::new("/library/Zed/A - B");
        assert_eq!(fallback_verify(&key, folder, &VerificationRules::default()), None);
    }

    #[test]
    fn test_relative_folder_uses_absolute_path() {
        let key = SongKey::new("A", "B", "C");
        let cwd = std::env::current_dir().unwrap();
        let marker = cwd.file_name().unwrap().to_string_lossy().into_owned();
        let folder = Path::new("A - B");
        assert_eq!(
            fallback_verify(&key, folder, &rules("C", &marker)),
            Some(FallbackEvidence::PathHint(marker.clone()))
        );
    }
}
