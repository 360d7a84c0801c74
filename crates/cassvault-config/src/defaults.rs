//! Default locations and names for a stock node layout.
//!
//! # Design
//! - Centralize the fixed paths so nothing else hard-codes them.
//! - Every value here can be overridden through the config file or environment.

/// Root under which Cassandra keeps its data files.
pub const DATA_DIRECTORY_ROOT: &str = "/opt/appscale/cassandra";
/// Directory that holds the latest backup archive.
pub const BACKUP_DIRECTORY: &str = "/opt/appscale/backups";
/// File name of the single backup archive inside the backup directory.
pub const ARCHIVE_FILE_NAME: &str = "backup.tar.gz";
/// Name of the lock file guarding pipeline runs, inside the backup directory.
pub const LOCK_FILE_NAME: &str = ".cassvault.lock";
/// Supervisor watch name of the Cassandra process.
pub const SERVICE_NAME: &str = "cassandra-9999";
/// Full path of the `nodetool` binary.
pub const ADMIN_TOOL_PATH: &str = "/root/appscale/AppDB/cassandra/cassandra/bin/nodetool";
/// Supervisor control binary, resolved through `PATH` when relative.
pub const SUPERVISOR_PATH: &str = "monit";
/// Default log level when neither `RUST_LOG` nor the config sets one.
pub const LOG_LEVEL: &str = "info";
