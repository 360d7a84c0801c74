//! Snapshot → collect → archive.

use std::path::PathBuf;

use cassvault_telemetry::Metrics;
use tracing::{error, info, info_span};

use super::{BACKUP, StepKind, StepRunner, archive_inside};
use crate::archive::create_archive;
use crate::collect::collect_snapshot_files;
use crate::error::{OpsError, OpsResult};
use crate::lease::NodeLease;
use crate::model::ArchiveSummary;
use crate::snapshot::SnapshotManager;

/// Produces a compressed archive of a fresh node snapshot.
pub struct BackupPipeline {
    snapshots: SnapshotManager,
    data_directory: PathBuf,
    archive_path: PathBuf,
    metrics: Metrics,
}

impl BackupPipeline {
    /// Back up `data_directory` into the archive at `archive_path`.
    #[must_use]
    pub fn new(
        snapshots: SnapshotManager,
        data_directory: impl Into<PathBuf>,
        archive_path: impl Into<PathBuf>,
        metrics: Metrics,
    ) -> Self {
        Self {
            snapshots,
            data_directory: data_directory.into(),
            archive_path: archive_path.into(),
            metrics,
        }
    }

    /// Clear old snapshots, snapshot the node, and archive the snapshot
    /// directories. The returned summary names the final archive path.
    ///
    /// An archive path inside the data directory is refused before any step
    /// runs. The first failing step aborts the run; later steps never execute.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub fn run(&self, lease: &NodeLease) -> OpsResult<ArchiveSummary> {
        let span = info_span!(
            "backup",
            data_directory = %self.data_directory.display(),
            archive = %self.archive_path.display(),
            lease = %lease.path().display()
        );
        let _entered = span.enter();

        let result = self.run_steps();
        self.metrics.record_run(BACKUP, result.is_ok());
        match &result {
            Ok(summary) => {
                self.metrics.set_archive_bytes(summary.bytes);
                info!(
                    archive = %summary.path.display(),
                    files = summary.files,
                    bytes = summary.bytes,
                    "backup completed"
                );
            }
            Err(err) => error!(error = %err, "backup aborted"),
        }
        result
    }

    fn run_steps(&self) -> OpsResult<ArchiveSummary> {
        if archive_inside(&self.archive_path, &self.data_directory) {
            return Err(OpsError::InvalidInput {
                field: "archive_path",
                reason: "inside_data_directory",
                value: Some(self.archive_path.display().to_string()),
            });
        }
        let steps = StepRunner::new(BACKUP, &self.metrics);

        steps.execute(StepKind::ClearSnapshots, || self.snapshots.clear_snapshots())?;
        steps.execute(StepKind::CreateSnapshot, || self.snapshots.create_snapshot())?;
        let files = steps.execute(StepKind::CollectFiles, || {
            collect_snapshot_files(&self.data_directory)
        })?;
        steps.execute(StepKind::CreateArchive, || {
            create_archive(&files, &self.archive_path)
        })
    }
}
