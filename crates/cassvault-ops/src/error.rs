//! # Design
//!
//! - One error type for every backup and restore step, with constant messages.
//! - Context (command line, path, operation label) lives in fields so logs and
//!   tests can inspect it without parsing strings.
//! - Source errors are preserved for `{:#}` rendering at the CLI boundary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::service::SupervisorError;

/// Result type for backup and restore operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Errors produced by the backup and restore pipelines.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The database admin tool could not be started.
    #[error("admin tool could not be launched")]
    ToolLaunch {
        /// Rendered command line.
        command: String,
        /// Underlying spawn error.
        source: io::Error,
    },
    /// The database admin tool ran but reported failure.
    #[error("admin tool command failed")]
    ToolExecution {
        /// Rendered command line.
        command: String,
        /// Exit status when the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Trailing stderr output.
        stderr: String,
    },
    /// The process supervisor rejected or failed a stop/start request.
    #[error("service control request failed")]
    ServiceControl {
        /// Supervisor watch name.
        service_name: String,
        /// Requested action (`stop` or `start`).
        action: &'static str,
        /// Error reported by the supervisor implementation.
        #[source]
        source: SupervisorError,
    },
    /// Filesystem traversal or mutation failed.
    #[error("filesystem operation failed")]
    Filesystem {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The wiper refused to touch the requested directory.
    #[error("refusing to wipe directory")]
    WipeRefused {
        /// Static reason for the refusal.
        reason: &'static str,
        /// Directory that was requested.
        path: PathBuf,
    },
    /// Writing the backup archive failed.
    #[error("archive creation failed")]
    Archive {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Reading or unpacking the backup archive failed.
    #[error("archive restore failed")]
    Restore {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The archive or the restore target violated a restore precondition.
    #[error("archive restore rejected")]
    RestoreRejected {
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending entry or directory.
        path: PathBuf,
    },
    /// Another backup or restore already holds the node lease.
    #[error("node lease unavailable")]
    Lease {
        /// Lock file path.
        path: PathBuf,
        /// Underlying lock error.
        source: io::Error,
    },
    /// Caller-supplied input failed validation.
    #[error("invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl OpsError {
    pub(crate) fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Archive {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn restore(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Restore {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn rejected(reason: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::RestoreRejected {
            reason,
            path: path.into(),
        }
    }

    /// Walkdir errors carry their own path; fall back to the walk root.
    pub(crate) fn walk(
        operation: &'static str,
        root: &std::path::Path,
        source: walkdir::Error,
    ) -> Self {
        let path = source.path().unwrap_or(root).to_path_buf();
        Self::Filesystem {
            operation,
            path,
            source: io::Error::from(source),
        }
    }

    /// Path the error refers to, when it has one.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Filesystem { path, .. }
            | Self::WipeRefused { path, .. }
            | Self::Archive { path, .. }
            | Self::Restore { path, .. }
            | Self::RestoreRejected { path, .. }
            | Self::Lease { path, .. } => Some(path),
            Self::ToolLaunch { .. }
            | Self::ToolExecution { .. }
            | Self::ServiceControl { .. }
            | Self::InvalidInput { .. } => None,
        }
    }
}
