//! Per-node exclusive lease.
//!
//! Backup and restore both require a [`NodeLease`], so at most one of them
//! runs per node at a time. The lease is an advisory `flock` on a file next
//! to the archive and is released on drop.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{OpsError, OpsResult};

/// Exclusive hold on a node's backup state.
#[derive(Debug)]
pub struct NodeLease {
    file: File,
    path: PathBuf,
}

impl NodeLease {
    /// Take the lease at `path` without waiting.
    ///
    /// The lock file and its parent directory are created when missing.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Lease`] when the file cannot be opened or another
    /// process (or another lease in this process) already holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> OpsResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| OpsError::Lease {
                path: path.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| OpsError::Lease {
                path: path.clone(),
                source,
            })?;
        file.try_lock_exclusive().map_err(|source| OpsError::Lease {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "acquired node lease");
        Ok(Self { file, path })
    }

    /// Lock file backing the lease.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NodeLease {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %err, "failed to release node lease");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lease_is_refused_until_first_drops() -> Result<(), Box<dyn std::error::Error>> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("backups/.cassvault.lock");

        let first = NodeLease::acquire(&path)?;
        assert_eq!(first.path(), path.as_path());
        assert!(matches!(
            NodeLease::acquire(&path),
            Err(OpsError::Lease { .. })
        ));

        drop(first);
        let again = NodeLease::acquire(&path)?;
        assert!(again.path().exists());
        Ok(())
    }
}
