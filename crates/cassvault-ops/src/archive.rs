//! Gzip-compressed tar archive creation.
//!
//! # Design
//! - Exactly one archive exists at the destination after a successful run:
//!   any previous archive is removed before writing starts.
//! - Entry names are relative to the data directory so a restore lands the
//!   tree back in place. Directories between the data directory and each
//!   snapshot directory are archived too, so their modes survive a restore.
//! - A failed write removes the partial file.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use chrono::Utc;
use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, HeaderMode};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{OpsError, OpsResult};
use crate::model::{ArchiveSummary, FileSet};

/// Write every directory in `files` into a fresh `tar.gz` at `destination`.
///
/// The destination's parent is created if needed. An empty set produces a
/// valid archive with no entries.
///
/// # Errors
///
/// Returns [`OpsError::Archive`] when the destination cannot be prepared, a
/// directory cannot be read, or the archive cannot be written.
pub fn create_archive(files: &FileSet, destination: &Path) -> OpsResult<ArchiveSummary> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| OpsError::archive("create_archive.prepare_dir", parent, source))?;
    }

    match fs::remove_file(destination) {
        Ok(()) => debug!(path = %destination.display(), "removed previous archive"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(OpsError::archive(
                "create_archive.remove_previous",
                destination,
                source,
            ));
        }
    }

    let file = File::create(destination)
        .map_err(|source| OpsError::archive("create_archive.create", destination, source))?;

    let counts = match write_entries(files, file, destination) {
        Ok(counts) => counts,
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(destination) {
                warn!(
                    path = %destination.display(),
                    error = %cleanup,
                    "failed to remove partial archive"
                );
            }
            return Err(err);
        }
    };

    let bytes = fs::metadata(destination)
        .map_err(|source| OpsError::archive("create_archive.stat", destination, source))?
        .len();

    info!(
        path = %destination.display(),
        files = counts.files,
        directories = counts.roots,
        bytes,
        "wrote backup archive"
    );

    Ok(ArchiveSummary {
        path: destination.to_path_buf(),
        files: counts.files,
        directories: counts.roots,
        bytes,
        created_at: Utc::now(),
    })
}

struct EntryCounts {
    roots: usize,
    files: usize,
}

fn write_entries(files: &FileSet, file: File, destination: &Path) -> OpsResult<EntryCounts> {
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.mode(HeaderMode::Complete);
    builder.follow_symlinks(false);

    let roots = files.archive_roots();
    for ancestor in ancestor_directories(files.root(), &roots) {
        append_ancestor(&mut builder, files.root(), ancestor)?;
    }

    let mut counts = EntryCounts {
        roots: roots.len(),
        files: 0,
    };
    for directory in roots {
        counts.files += append_directory(&mut builder, files.root(), directory)?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|source| OpsError::archive("create_archive.finish_tar", destination, source))?;
    let writer = encoder
        .finish()
        .map_err(|source| OpsError::archive("create_archive.finish_gzip", destination, source))?;
    let file = writer
        .into_inner()
        .map_err(|err| OpsError::archive("create_archive.flush", destination, err.into_error()))?;
    file.sync_all()
        .map_err(|source| OpsError::archive("create_archive.sync", destination, source))?;
    Ok(counts)
}

/// Directories strictly between `root` and each archive root, parents first.
fn ancestor_directories<'a>(root: &Path, roots: &[&'a Path]) -> Vec<&'a Path> {
    let mut ancestors = BTreeSet::new();
    for directory in roots.iter().copied() {
        for ancestor in directory.ancestors().skip(1) {
            if ancestor == root || !ancestor.starts_with(root) {
                break;
            }
            ancestors.insert(ancestor);
        }
    }
    ancestors.into_iter().collect()
}

fn append_ancestor<W: io::Write>(
    builder: &mut Builder<W>,
    root: &Path,
    directory: &Path,
) -> OpsResult<()> {
    let Ok(name) = directory.strip_prefix(root) else {
        return Ok(());
    };
    builder
        .append_dir(name, directory)
        .map_err(|source| OpsError::archive("create_archive.append_parent", directory, source))
}

fn append_directory<W: io::Write>(
    builder: &mut Builder<W>,
    root: &Path,
    directory: &Path,
) -> OpsResult<usize> {
    let relative = directory
        .strip_prefix(root)
        .map_err(|_| OpsError::InvalidInput {
            field: "snapshot_directory",
            reason: "outside_data_directory",
            value: Some(directory.display().to_string()),
        })?;

    let mut appended_files = 0;
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| {
            let path = source.path().unwrap_or(directory).to_path_buf();
            OpsError::archive("create_archive.walk", path, io::Error::from(source))
        })?;
        let name = match entry.path().strip_prefix(directory) {
            Ok(suffix) if suffix.as_os_str().is_empty() => relative.to_path_buf(),
            Ok(suffix) => relative.join(suffix),
            Err(_) => continue,
        };

        if entry.file_type().is_dir() {
            builder.append_dir(&name, entry.path()).map_err(|source| {
                OpsError::archive("create_archive.append_dir", entry.path(), source)
            })?;
        } else {
            builder
                .append_path_with_name(entry.path(), &name)
                .map_err(|source| {
                    OpsError::archive("create_archive.append_file", entry.path(), source)
                })?;
            if entry.file_type().is_file() {
                appended_files += 1;
            }
        }
    }
    Ok(appended_files)
}
