//! JSON configuration.
//!
//! ```json
//! {
//!   "song_directories": ["~/Clone Hero/Songs", "/Volumes/Extra/Songs"],
//!   "charter_verification": { "Harmonix": { "parent_dir_substring": "Rock Band" } },
//!   "base_download_path": "~/Downloads/chorus",
//!   "dest_song_directory_idx": 0
//! }
//! ```
//!
//! Every field is optional; command-line flags override what is loaded here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::VerificationRules;
use crate::pipeline::DEFAULT_EXTENSION;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sng_dedup_config.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Library roots, scanned in this order
    pub song_directories: Vec<PathBuf>,
    pub charter_verification: VerificationRules,
    /// Parent of per-search batch folders
    pub base_download_path: Option<PathBuf>,
    /// Index into `song_directories` of the library that receives new songs
    pub dest_song_directory_idx: Option<usize>,
    /// Subfolder of that library new songs go into
    pub dest_subfolder: String,
    pub extension: String,
    /// 0 keeps duplicate checking sequential
    pub workers: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            song_directories: Vec::new(),
            charter_verification: VerificationRules::default(),
            base_download_path: None,
            dest_song_directory_idx: None,
            dest_subfolder: "Chorus".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            workers: 0,
        }
    }
}

impl DedupConfig {
    /// Batch folder `name` under `base_download_path`.
    pub fn batch_dir(&self, name: &str) -> Option<PathBuf> {
        self.base_download_path.as_ref().map(|base| base.join(name))
    }

    /// `song_directories[dest_song_directory_idx]/<dest_subfolder>[/<folder>]`
    pub fn destination(&self, folder: Option<&str>) -> Option<PathBuf> {
        let root = self.song_directories.get(self.dest_song_directory_idx?)?;
        let dest = root.join(&self.dest_subfolder);
        Some(match folder {
            Some(folder) if !folder.is_empty() => dest.join(folder),
            _ => dest,
        })
    }

    fn expand_paths(mut self) -> Self {
        self.song_directories = self.song_directories.iter().map(|p| expand_tilde(p)).collect();
        self.base_download_path = self.base_download_path.as_deref().map(expand_tilde);
        self
    }
}

/// Parse a config document.
pub fn parse_config(json: &str) -> Result<DedupConfig> {
    let config: DedupConfig = serde_json::from_str(json).context("Failed to parse config JSON")?;
    Ok(config.expand_paths())
}

/// Read and parse the config file at `path`.
pub fn load_config(path: &Path) -> Result<DedupConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&json).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Load `explicit` if given (it must exist), else [`DEFAULT_CONFIG_FILE`] if
/// present, else defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<DedupConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                load_config(default_path)
            } else {
                Ok(DedupConfig::default())
            }
        }
    }
}

/// Expand a leading `~` from `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationRule;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"{
                "song_directories": ["/songs/main", "/songs/extra"],
                "charter_verification": {
                    "Harmonix": { "parent_dir_substring": "Rock Band" },
                    "Nobody": {}
                },
                "base_download_path": "/downloads",
                "dest_song_directory_idx": 1,
                "minor_sleep_val": 2
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.song_directories,
            vec![PathBuf::from("/songs/main"), PathBuf::from("/songs/extra")]
        );
        assert_eq!(
            config.charter_verification.get("Harmonix"),
            Some(&VerificationRule::new("Rock Band"))
        );
        assert_eq!(config.charter_verification.get("Nobody"), Some(&VerificationRule::default()));
        assert_eq!(config.extension, "sng");
        assert_eq!(config.workers, 0);
        assert_eq!(config.batch_dir("metal"), Some(PathBuf::from("/downloads/metal")));
        assert_eq!(
            config.destination(Some("Metallica")),
            Some(PathBuf::from("/songs/extra/Chorus/Metallica"))
        );
        assert_eq!(config.destination(None), Some(PathBuf::from("/songs/extra/Chorus")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert!(config.song_directories.is_empty());
        assert!(config.charter_verification.is_empty());
        assert_eq!(config.dest_subfolder, "Chorus");
        assert_eq!(config.destination(None), None);
        assert_eq!(config.batch_dir("x"), None);
    }

    #[test]
    fn test_destination_index_out_of_range() {
        let config = parse_config(r#"{"song_directories": ["/a"], "dest_song_directory_idx": 3}"#).unwrap();
        assert_eq!(config.destination(None), None);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = parse_config(r#"{"song_directories": "not a list"}"#).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = load_or_default(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_tilde(Path::new("~/Songs")), PathBuf::from(home).join("Songs"));
        }
    }
}
