//! Library traversal.
//!
//! [`scan_library`] walks each root depth-first (roots in the order given,
//! entries in file-name order) and lazily yields [`Candidate`]s:
//! - an exact-file candidate when a visited directory holds the key's
//!   display file name
//! - a folder candidate for every subdirectory whose name contains
//!   `"<Artist> - <Title>"`, ignoring case
//!
//! Nothing is opened for writing and symlinks are not followed.

use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::{Candidate, SongKey};

/// Lazy candidate stream over one or more library roots.
pub struct LibraryScan<'a> {
    roots: std::slice::Iter<'a, PathBuf>,
    walker: Option<walkdir::IntoIter>,
    pending: VecDeque<Candidate>,
    target_file: String,
    folder_needle: String,
}

/// Start a scan for `key` across `roots`. `extension` (no dot) completes the
/// display file name searched for.
pub fn scan_library<'a>(roots: &'a [PathBuf], key: &SongKey, extension: &str) -> LibraryScan<'a> {
    LibraryScan {
        roots: roots.iter(),
        walker: None,
        pending: VecDeque::new(),
        target_file: key.display_file_name(extension),
        folder_needle: key.folder_stem().to_lowercase(),
    }
}

impl LibraryScan<'_> {
    /// Queue candidates contributed by one directory entry.
    ///
    /// The directory itself may be a folder candidate of its parent; after
    /// that we check whether it holds the exact file. Since a parent is
    /// always visited before its children, each directory's exact file is
    /// queued ahead of its subfolder candidates.
    fn visit(&mut self, entry: &DirEntry) {
        if !entry.file_type().is_dir() {
            return;
        }
        let dir = entry.path();

        if entry.depth() > 0 {
            let name = entry.file_name().to_string_lossy();
            if name.to_lowercase().contains(&self.folder_needle) {
                if let Some(parent) = dir.parent() {
                    self.pending.push_back(Candidate::folder(dir.to_path_buf(), parent));
                }
            }
        }

        let exact = dir.join(&self.target_file);
        if exact.is_file() {
            self.pending.push_back(Candidate::exact_file(exact, dir));
        }
    }
}

impl Iterator for LibraryScan<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some(candidate) = self.pending.pop_front() {
                return Some(candidate);
            }

            let walker = match self.walker.as_mut() {
                Some(walker) => walker,
                None => {
                    let root = self.roots.next()?;
                    debug!("Scanning library root {}", root.display());
                    self.walker = Some(
                        WalkDir::new(root)
                            .follow_links(false)
                            .sort_by_file_name()
                            .into_iter(),
                    );
                    continue;
                }
            };

            match walker.next() {
                None => self.walker = None,
                Some(Err(e)) => warn!("Skipping unreadable library path: {}", e),
                Some(Ok(entry)) => self.visit(&entry),
            }
        }
    }
}
