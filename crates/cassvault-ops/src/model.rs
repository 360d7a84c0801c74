//! Values passed between pipeline steps.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot directories discovered under a data directory.
///
/// `paths` holds one entry per snapshot file, naming the file's parent
/// directory, so a directory with `n` files appears `n` times. Consumers that
/// need unique directories use [`FileSet::directories`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl FileSet {
    /// Empty set rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths: Vec::new(),
        }
    }

    /// Build a set from already collected directory entries.
    #[must_use]
    pub fn from_paths(root: impl Into<PathBuf>, paths: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    pub(crate) fn push(&mut self, directory: PathBuf) {
        self.paths.push(directory);
    }

    /// Data directory the set was collected from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw entries, duplicates included, in walk order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of raw entries (equals the number of snapshot files seen).
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no snapshot file was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Unique directories in first-seen order.
    #[must_use]
    pub fn directories(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        self.paths
            .iter()
            .map(PathBuf::as_path)
            .filter(|path| seen.insert(*path))
            .collect()
    }

    /// Unique directories that are not nested inside another entry.
    ///
    /// Archiving each of these recursively covers every entry exactly once.
    #[must_use]
    pub fn archive_roots(&self) -> Vec<&Path> {
        let unique = self.directories();
        unique
            .iter()
            .copied()
            .filter(|candidate| {
                !unique
                    .iter()
                    .any(|other| other != candidate && candidate.starts_with(other))
            })
            .collect()
    }
}

/// Result of writing a backup archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    /// Final archive location.
    pub path: PathBuf,
    /// Regular files stored in the archive.
    pub files: usize,
    /// Directories archived recursively.
    pub directories: usize,
    /// Size of the compressed archive.
    pub bytes: u64,
    /// Time the archive was finalised.
    pub created_at: DateTime<Utc>,
}

/// Result of unpacking (or verifying) a backup archive.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreSummary {
    /// Archive that was read.
    pub archive: PathBuf,
    /// Directory the archive was unpacked into, if it was unpacked.
    pub target: Option<PathBuf>,
    /// Entries of any type in the archive.
    pub entries: usize,
    /// Regular files among the entries.
    pub files: usize,
}
