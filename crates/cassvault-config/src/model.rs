//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; loading lives in `loader.rs` and checks in `validate.rs`.
//! - Every field has a default so a node with the stock layout needs no file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Configuration supplied to both pipelines at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Root of the database's on-disk data.
    pub data_directory_root: PathBuf,
    /// Directory holding the backup archive and the pipeline lock file.
    pub backup_directory: PathBuf,
    /// File name of the archive inside `backup_directory`.
    pub archive_file_name: String,
    /// Supervisor watch name of the database process.
    pub service_name: String,
    /// Path of the snapshot-capable admin tool (`nodetool`).
    pub admin_tool_path: PathBuf,
    /// Path of the supervisor control binary (`monit`).
    pub supervisor_path: PathBuf,
    /// Object-store bucket used to derive the upload destination key.
    pub bucket_name: Option<String>,
    /// Host name override for the destination key; the OS host name otherwise.
    pub host_name: Option<String>,
    /// Logging options.
    pub telemetry: TelemetryConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_directory_root: PathBuf::from(defaults::DATA_DIRECTORY_ROOT),
            backup_directory: PathBuf::from(defaults::BACKUP_DIRECTORY),
            archive_file_name: defaults::ARCHIVE_FILE_NAME.to_string(),
            service_name: defaults::SERVICE_NAME.to_string(),
            admin_tool_path: PathBuf::from(defaults::ADMIN_TOOL_PATH),
            supervisor_path: PathBuf::from(defaults::SUPERVISOR_PATH),
            bucket_name: None,
            host_name: None,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Fixed location of the backup archive.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.backup_directory.join(&self.archive_file_name)
    }

    /// Location of the advisory lock file that serialises pipeline runs.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.backup_directory.join(defaults::LOCK_FILE_NAME)
    }
}

/// Logging options applied when the subscriber is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Fallback level when `RUST_LOG` is not set.
    pub log_level: String,
    /// `json` or `pretty`; inferred from the build profile when unset.
    pub log_format: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::LOG_LEVEL.to_string(),
            log_format: None,
        }
    }
}
