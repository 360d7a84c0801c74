//! Node directory layouts and filesystem helpers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Temporary node with a data directory and a backup directory.
pub struct NodeLayout {
    temp: TempDir,
}

impl NodeLayout {
    /// Create `data/` and `backups/` under a fresh temporary root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("cassvault-")
            .tempdir()
            .context("create temporary node root")?;
        fs::create_dir_all(temp.path().join("data")).context("create data directory")?;
        fs::create_dir_all(temp.path().join("backups")).context("create backup directory")?;
        Ok(Self { temp })
    }

    /// Temporary root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Database data directory.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    /// Directory holding the archive and lock file.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.temp.path().join("backups")
    }

    /// Archive location inside the backup directory.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.backup_dir().join("backup.tar.gz")
    }

    /// Lease file inside the backup directory.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.backup_dir().join(".cassvault.lock")
    }
}

/// Write `contents` to `root/relative`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// One node in a [`tree_listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    /// Directory with its permission bits.
    Directory {
        /// Permission bits (`0` off unix).
        mode: u32,
    },
    /// Regular file with its permission bits and bytes.
    File {
        /// Permission bits (`0` off unix).
        mode: u32,
        /// File contents.
        contents: Vec<u8>,
    },
}

/// Snapshot of every entry below `root`, keyed by relative path.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a file cannot be read.
pub fn tree_listing(root: &Path) -> Result<BTreeMap<PathBuf, TreeEntry>> {
    let mut listing = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .context("entry outside walk root")?
            .to_path_buf();
        let metadata = entry.metadata().context("read entry metadata")?;
        let mode = permission_bits(&metadata);
        let node = if metadata.is_dir() {
            TreeEntry::Directory { mode }
        } else {
            TreeEntry::File {
                mode,
                contents: fs::read(entry.path())
                    .with_context(|| format!("read {}", entry.path().display()))?,
            }
        };
        listing.insert(relative, node);
    }
    Ok(listing)
}

/// Listing restricted to entries under a `snapshots` segment.
///
/// # Errors
///
/// Propagates [`tree_listing`] failures.
pub fn snapshot_listing(root: &Path) -> Result<BTreeMap<PathBuf, TreeEntry>> {
    Ok(tree_listing(root)?
        .into_iter()
        .filter(|(path, _)| {
            path.parent()
                .is_some_and(|parent| parent.iter().any(|segment| segment == "snapshots"))
        })
        .collect())
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
const fn permission_bits(_metadata: &fs::Metadata) -> u32 {
    0
}
