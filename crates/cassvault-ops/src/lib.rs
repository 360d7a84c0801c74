#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Backup and restore lifecycle for a Cassandra node's data directory.
//!
//! Backup: `snapshot` → `collect` → `archive`.
//! Restore: `service` stop → `wipe` → `restore` → `service` start.
//!
//! Both pipelines live in `pipeline/` and require a [`NodeLease`] held by the
//! caller.

pub mod archive;
pub mod collect;
mod command;
pub mod destination;
pub mod error;
pub mod lease;
pub mod model;
pub mod pipeline;
pub mod restore;
pub mod service;
pub mod snapshot;
pub mod wipe;

pub use archive::create_archive;
pub use collect::collect_snapshot_files;
pub use command::CommandError;
pub use destination::{backup_destination_path, local_host_name};
pub use error::{OpsError, OpsResult};
pub use lease::NodeLease;
pub use model::{ArchiveSummary, FileSet, RestoreSummary};
pub use pipeline::{BackupPipeline, RestorePipeline};
pub use restore::{restore_from_archive, verify_archive};
pub use service::{
    MonitSupervisor, ServiceAction, ServiceController, ServiceStopped, Supervisor,
    SupervisorError,
};
pub use snapshot::{AdminCommand, AdminTool, Nodetool, SnapshotManager};
pub use wipe::wipe_data_directory;
