//! Removal of a data directory's contents before restore.

use std::fs;
use std::io;
use std::path::{Component, Path};

use tracing::{debug, warn};

use crate::error::{OpsError, OpsResult};
use crate::service::ServiceStopped;

/// Delete every entry inside `data_directory`, keeping the directory itself.
///
/// Requires the stop acknowledgement for the service that owns the data. A
/// missing directory counts as already empty. Returns the number of top-level
/// entries removed.
///
/// # Errors
///
/// Returns [`OpsError::WipeRefused`] for relative paths, the filesystem root,
/// symlinks, and non-directories, and [`OpsError::Filesystem`] when an entry
/// cannot be removed.
pub fn wipe_data_directory(data_directory: &Path, stopped: &ServiceStopped) -> OpsResult<usize> {
    guard(data_directory)?;

    let metadata = match fs::symlink_metadata(data_directory) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(
                path = %data_directory.display(),
                "data directory does not exist; nothing to wipe"
            );
            return Ok(0);
        }
        Err(source) => {
            return Err(OpsError::filesystem("wipe.metadata", data_directory, source));
        }
    };
    if !metadata.is_dir() {
        return Err(OpsError::WipeRefused {
            reason: "not_a_directory",
            path: data_directory.to_path_buf(),
        });
    }

    warn!(
        service = stopped.service_name(),
        path = %data_directory.display(),
        "wiping data directory"
    );

    let entries = fs::read_dir(data_directory)
        .map_err(|source| OpsError::filesystem("wipe.read_dir", data_directory, source))?;
    let mut removed = 0;
    for entry in entries {
        let entry =
            entry.map_err(|source| OpsError::filesystem("wipe.read_dir", data_directory, source))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|source| OpsError::filesystem("wipe.file_type", &path, source))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path)
                .map_err(|source| OpsError::filesystem("wipe.remove_dir", &path, source))?;
        } else {
            fs::remove_file(&path)
                .map_err(|source| OpsError::filesystem("wipe.remove_file", &path, source))?;
        }
        debug!(path = %path.display(), "removed");
        removed += 1;
    }
    Ok(removed)
}

fn guard(data_directory: &Path) -> OpsResult<()> {
    let refuse = |reason| {
        Err(OpsError::WipeRefused {
            reason,
            path: data_directory.to_path_buf(),
        })
    };
    if !data_directory.is_absolute() {
        return refuse("relative_path");
    }
    if data_directory
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return refuse("parent_segment");
    }
    if data_directory.parent().is_none() {
        return refuse("filesystem_root");
    }
    Ok(())
}
