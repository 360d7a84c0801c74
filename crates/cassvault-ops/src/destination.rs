//! Remote destination key for a node's backups.
//!
//! Nothing is uploaded here; callers that ship archives to object storage use
//! the key to place them.

/// Object-store key prefix for `host`'s Cassandra backups in `bucket`.
///
/// The result always ends with `/`. Inputs are used verbatim.
#[must_use]
pub fn backup_destination_path(bucket: &str, host: &str) -> String {
    format!("{bucket}/{host}/cassandra/")
}

/// Hostname of the machine running the tool.
#[must_use]
pub fn local_host_name() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}
