//! Snapshot file discovery.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{OpsError, OpsResult};
use crate::model::FileSet;

/// Directory segment the database uses for snapshot output.
pub const SNAPSHOT_SEGMENT: &str = "snapshots";

/// Walk `data_directory` and record the parent directory of every
/// non-directory entry that sits under a `snapshots` segment.
///
/// The walk is sorted by file name and does not follow symlinks. The segment
/// test only considers components below `data_directory`.
///
/// # Errors
///
/// Returns [`OpsError::Filesystem`] when the root is missing, is not a
/// directory, or any part of the tree cannot be read.
pub fn collect_snapshot_files(data_directory: &Path) -> OpsResult<FileSet> {
    let metadata = fs::metadata(data_directory)
        .map_err(|source| OpsError::filesystem("collect.metadata", data_directory, source))?;
    if !metadata.is_dir() {
        return Err(OpsError::filesystem(
            "collect.metadata",
            data_directory,
            io::Error::new(io::ErrorKind::NotADirectory, "data directory is not a directory"),
        ));
    }

    let mut files = FileSet::new(data_directory);
    for entry in WalkDir::new(data_directory)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| OpsError::walk("collect.walk", data_directory, source))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let Some(parent) = entry.path().parent() else {
            continue;
        };
        if under_snapshot_segment(data_directory, parent) {
            files.push(parent.to_path_buf());
        }
    }

    info!(
        data_directory = %data_directory.display(),
        files = files.len(),
        directories = files.directories().len(),
        "collected snapshot files"
    );
    if files.is_empty() {
        debug!("no snapshot files found; archive will be empty");
    }
    Ok(files)
}

fn under_snapshot_segment(root: &Path, directory: &Path) -> bool {
    directory.strip_prefix(root).is_ok_and(|relative| {
        relative
            .components()
            .any(|component| component == Component::Normal(OsStr::new(SNAPSHOT_SEGMENT)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    fn touch(root: &Path, relative: &str) -> TestResult<()> {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, relative.as_bytes())?;
        Ok(())
    }

    #[test]
    fn one_entry_per_snapshot_file() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        touch(temp.path(), "keyspace1/snapshots/snap1/a.db")?;
        touch(temp.path(), "keyspace1/snapshots/snap1/b.db")?;

        let files = collect_snapshot_files(temp.path())?;
        let snap = temp.path().join("keyspace1/snapshots/snap1");
        assert_eq!(files.paths(), &[snap.clone(), snap.clone()]);
        assert_eq!(files.directories(), vec![snap.as_path()]);
        Ok(())
    }

    #[test]
    fn live_sstables_and_lookalike_names_are_skipped() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        touch(temp.path(), "ks/table-1/live.db")?;
        touch(temp.path(), "ks/table-1/snapshots_old/x.db")?;
        touch(temp.path(), "ks/table-1/snapshots/1700000000/y.db")?;
        fs::create_dir_all(temp.path().join("ks/table-2/snapshots/empty"))?;

        let files = collect_snapshot_files(temp.path())?;
        assert_eq!(
            files.paths(),
            &[temp.path().join("ks/table-1/snapshots/1700000000")]
        );
        Ok(())
    }

    #[test]
    fn root_segment_named_snapshots_does_not_match_everything() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("snapshots");
        touch(&root, "ks/live.db")?;

        assert!(collect_snapshot_files(&root)?.is_empty());
        Ok(())
    }

    #[test]
    fn walk_order_is_sorted() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        touch(temp.path(), "b/snapshots/s/1.db")?;
        touch(temp.path(), "a/snapshots/s/1.db")?;

        let files = collect_snapshot_files(temp.path())?;
        let expected: Vec<PathBuf> = vec![
            temp.path().join("a/snapshots/s"),
            temp.path().join("b/snapshots/s"),
        ];
        assert_eq!(files.paths(), expected.as_slice());
        Ok(())
    }

    #[test]
    fn missing_root_is_a_filesystem_error() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("absent");
        let err = collect_snapshot_files(&missing);
        assert!(matches!(
            err,
            Err(OpsError::Filesystem {
                operation: "collect.metadata",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn file_root_is_rejected() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        touch(temp.path(), "plain")?;
        assert!(collect_snapshot_files(&temp.path().join("plain")).is_err());
        Ok(())
    }
}
