//! Safety checks that run before anything is deleted.
//!
//! The batch directory is the only place this tool removes files from, so it
//! must never be one of the library roots or the placement destination.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Validate that `batch_dir` is an existing directory distinct from every
/// library root.
///
/// A batch directory nested *inside* a root is allowed; the pipeline leaves
/// the batch directory out of the library search. A root nested inside the
/// batch directory is refused, since it would be left out too.
pub fn validate_batch_dir(batch_dir: &Path, roots: &[PathBuf]) -> Result<()> {
    if !batch_dir.is_dir() {
        bail!(
            "Safety check failed: batch directory '{}' does not exist or is not a directory",
            batch_dir.display()
        );
    }

    let batch = canonical(batch_dir);
    for root in roots {
        let root_path = canonical(root);
        if root_path == batch {
            bail!(
                "Safety check failed: batch directory '{}' cannot be the same as library root '{}'",
                batch_dir.display(),
                root.display()
            );
        }
        if root_path.starts_with(&batch) {
            bail!(
                "Safety check failed: library root '{}' lies inside batch directory '{}'",
                root.display(),
                batch_dir.display()
            );
        }
    }

    Ok(())
}

/// Validate that files are not about to be "moved" onto themselves.
pub fn validate_destination(dest_dir: &Path, batch_dir: &Path) -> Result<()> {
    if canonical(dest_dir) == canonical(batch_dir) {
        bail!(
            "Safety check failed: destination '{}' cannot be the same as batch directory '{}'",
            dest_dir.display(),
            batch_dir.display()
        );
    }
    Ok(())
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_valid_batch_dir() {
        let library = TempDir::new().unwrap();
        let batch = TempDir::new().unwrap();
        assert!(validate_batch_dir(batch.path(), &[library.path().to_path_buf()]).is_ok());
    }

    #[test]
    fn test_batch_inside_root_is_allowed() {
        let library = TempDir::new().unwrap();
        let batch = library.path().join("Downloads");
        std::fs::create_dir_all(&batch).unwrap();
        assert!(validate_batch_dir(&batch, &[library.path().to_path_buf()]).is_ok());
    }

    #[test]
    fn test_batch_equal_to_root() {
        let library = TempDir::new().unwrap();
        let aliased = library.path().join(".");
        let result = validate_batch_dir(&aliased, &[library.path().to_path_buf()]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as library root"));
    }

    #[test]
    fn test_root_inside_batch_is_refused() {
        let batch = TempDir::new().unwrap();
        let library = batch.path().join("Songs");
        std::fs::create_dir_all(&library).unwrap();
        let result = validate_batch_dir(batch.path(), &[library]);
        assert!(result.unwrap_err().to_string().contains("lies inside batch directory"));
    }

    #[test]
    fn test_missing_batch_dir() {
        let tmp = TempDir::new().unwrap();
        let result = validate_batch_dir(&tmp.path().join("missing"), &[]);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_destination_equals_batch() {
        let batch = TempDir::new().unwrap();
        assert!(validate_destination(batch.path(), batch.path()).is_err());
        assert!(validate_destination(&batch.path().join("sub"), batch.path()).is_ok());
    }
}
