//! Archive verification and extraction.
//!
//! # Design
//! - Every entry path is checked before anything touches the target: absolute
//!   paths and `..` segments reject the whole archive.
//! - Extraction preserves permissions and modification times.
//! - The target must be empty; restore never merges into live data.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use crate::error::{OpsError, OpsResult};
use crate::model::RestoreSummary;

/// Read `archive_path` end to end and check every entry name.
///
/// Nothing is written. The gzip trailer is consumed so truncated or corrupt
/// archives are reported here rather than halfway through a restore.
///
/// # Errors
///
/// Returns [`OpsError::Restore`] when the archive cannot be read and
/// [`OpsError::RestoreRejected`] when an entry would escape the target.
pub fn verify_archive(archive_path: &Path) -> OpsResult<RestoreSummary> {
    let mut archive = open(archive_path)?;
    let mut entries = 0;
    let mut files = 0;
    for entry in archive
        .entries()
        .map_err(|source| OpsError::restore("verify.entries", archive_path, source))?
    {
        let entry =
            entry.map_err(|source| OpsError::restore("verify.read_entry", archive_path, source))?;
        let name = entry
            .path()
            .map_err(|source| OpsError::restore("verify.entry_path", archive_path, source))?;
        sanitize_archive_path(&name)?;
        entries += 1;
        if entry.header().entry_type().is_file() {
            files += 1;
        }
    }

    io::copy(&mut archive.into_inner(), &mut io::sink())
        .map_err(|source| OpsError::restore("verify.trailer", archive_path, source))?;

    info!(
        archive = %archive_path.display(),
        entries,
        files,
        "verified backup archive"
    );
    Ok(RestoreSummary {
        archive: archive_path.to_path_buf(),
        target: None,
        entries,
        files,
    })
}

/// Unpack `archive_path` into the empty `data_directory`.
///
/// The directory is created when missing. Entries are verified first, so a
/// rejected archive leaves the target untouched.
///
/// # Errors
///
/// Returns [`OpsError::RestoreRejected`] when the target is not empty or an
/// entry is unsafe, and [`OpsError::Restore`] when reading or writing fails.
pub fn restore_from_archive(archive_path: &Path, data_directory: &Path) -> OpsResult<RestoreSummary> {
    let verified = verify_archive(archive_path)?;

    fs::create_dir_all(data_directory)
        .map_err(|source| OpsError::restore("restore.prepare_target", data_directory, source))?;
    let mut existing = fs::read_dir(data_directory)
        .map_err(|source| OpsError::restore("restore.read_target", data_directory, source))?;
    if existing.next().is_some() {
        return Err(OpsError::rejected("target_not_empty", data_directory));
    }

    let mut archive = open(archive_path)?;
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(false);
    archive
        .unpack(data_directory)
        .map_err(|source| OpsError::restore("restore.unpack", data_directory, source))?;

    info!(
        archive = %archive_path.display(),
        target = %data_directory.display(),
        entries = verified.entries,
        files = verified.files,
        "restored backup archive"
    );
    Ok(RestoreSummary {
        target: Some(data_directory.to_path_buf()),
        ..verified
    })
}

fn open(archive_path: &Path) -> OpsResult<Archive<GzDecoder<BufReader<File>>>> {
    let file = File::open(archive_path)
        .map_err(|source| OpsError::restore("restore.open", archive_path, source))?;
    Ok(Archive::new(GzDecoder::new(BufReader::new(file))))
}

/// Normalise an entry name, rejecting anything that is not a plain relative
/// path.
pub(crate) fn sanitize_archive_path(entry: &Path) -> OpsResult<PathBuf> {
    if entry.is_absolute() {
        return Err(OpsError::rejected("absolute_path", entry));
    }

    let mut sanitized = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(OpsError::rejected("invalid_segment", entry));
            }
        }
    }
    if sanitized.as_os_str().is_empty() {
        return Err(OpsError::rejected("empty_path", entry));
    }
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, EntryType, Header};

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    fn write_archive(path: &Path, entries: &[(&str, &[u8])]) -> TestResult<()> {
        let encoder = GzEncoder::new(File::create(path)?, Compression::default());
        let mut builder = Builder::new(encoder);
        for (name, data) in entries {
            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(u64::try_from(data.len())?);
            header.set_mode(0o640);
            header.set_mtime(1_700_000_000);
            // Bypass `set_path` validation to simulate hostile archives.
            let raw = &mut header.as_old_mut().name;
            raw[..name.len()].copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder.append(&header, *data)?;
        }
        builder.into_inner()?.finish()?;
        Ok(())
    }

    #[test]
    fn sanitize_archive_path_rejects_unsafe_inputs() {
        assert!(matches!(
            sanitize_archive_path(Path::new("/etc/passwd")),
            Err(OpsError::RestoreRejected {
                reason: "absolute_path",
                ..
            })
        ));
        assert!(matches!(
            sanitize_archive_path(Path::new("ks/../../etc")),
            Err(OpsError::RestoreRejected {
                reason: "invalid_segment",
                ..
            })
        ));
        assert!(matches!(
            sanitize_archive_path(Path::new("./")),
            Err(OpsError::RestoreRejected {
                reason: "empty_path",
                ..
            })
        ));
        assert_eq!(
            sanitize_archive_path(Path::new("./ks/snapshots/s1/a.db")).ok(),
            Some(PathBuf::from("ks/snapshots/s1/a.db"))
        );
    }

    #[test]
    fn restores_files_with_contents_and_mtime() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("backup.tar.gz");
        write_archive(
            &archive,
            &[("ks/snapshots/s1/a.db", b"alpha"), ("ks/snapshots/s1/b.db", b"bravo")],
        )?;
        let target = temp.path().join("data");

        let summary = restore_from_archive(&archive, &target)?;
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.target.as_deref(), Some(target.as_path()));
        assert_eq!(fs::read(target.join("ks/snapshots/s1/a.db"))?, b"alpha");
        assert_eq!(fs::read(target.join("ks/snapshots/s1/b.db"))?, b"bravo");

        let modified = fs::metadata(target.join("ks/snapshots/s1/a.db"))?
            .modified()?
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();
        assert_eq!(modified, 1_700_000_000);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(target.join("ks/snapshots/s1/a.db"))?
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o640);
        }
        Ok(())
    }

    #[test]
    fn traversal_entry_rejects_archive_before_writing() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("hostile.tar.gz");
        write_archive(&archive, &[("ok.db", b"fine"), ("../escape.db", b"evil")])?;
        let target = temp.path().join("data");

        let err = restore_from_archive(&archive, &target);
        assert!(matches!(
            err,
            Err(OpsError::RestoreRejected {
                reason: "invalid_segment",
                ..
            })
        ));
        assert!(!temp.path().join("escape.db").exists());
        assert!(!target.exists());
        Ok(())
    }

    #[test]
    fn non_empty_target_is_rejected() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("backup.tar.gz");
        write_archive(&archive, &[("ks/a.db", b"alpha")])?;
        let target = temp.path().join("data");
        fs::create_dir_all(&target)?;
        fs::write(target.join("live.db"), b"live")?;

        assert!(matches!(
            restore_from_archive(&archive, &target),
            Err(OpsError::RestoreRejected {
                reason: "target_not_empty",
                ..
            })
        ));
        assert_eq!(fs::read(target.join("live.db"))?, b"live");
        Ok(())
    }

    #[test]
    fn corrupt_archive_is_a_restore_error() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("backup.tar.gz");
        fs::write(&archive, b"definitely not gzip")?;

        assert!(matches!(
            verify_archive(&archive),
            Err(OpsError::Restore { .. })
        ));
        Ok(())
    }

    #[test]
    fn missing_archive_is_a_restore_error() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        assert!(matches!(
            verify_archive(&temp.path().join("absent.tar.gz")),
            Err(OpsError::Restore {
                operation: "restore.open",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn truncated_archive_fails_verification() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("backup.tar.gz");
        let payload = vec![7_u8; 64 * 1024];
        write_archive(&archive, &[("ks/big.db", payload.as_slice())])?;
        let bytes = fs::read(&archive)?;
        fs::write(&archive, &bytes[..bytes.len() / 2])?;

        assert!(verify_archive(&archive).is_err());
        Ok(())
    }
}
