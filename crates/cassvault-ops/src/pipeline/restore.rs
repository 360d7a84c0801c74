//! Verify → stop → wipe → unpack → start.

use std::path::PathBuf;

use cassvault_telemetry::Metrics;
use tracing::{error, info, info_span};

use super::{RESTORE, StepKind, StepRunner, archive_inside};
use crate::error::{OpsError, OpsResult};
use crate::lease::NodeLease;
use crate::model::RestoreSummary;
use crate::restore::{restore_from_archive, verify_archive};
use crate::service::ServiceController;
use crate::wipe::wipe_data_directory;

/// Replaces a node's data directory with the contents of a backup archive.
pub struct RestorePipeline {
    controller: ServiceController,
    service_name: String,
    data_directory: PathBuf,
    archive_path: PathBuf,
    metrics: Metrics,
}

impl RestorePipeline {
    /// Restore `archive_path` into `data_directory`, cycling `service_name`.
    #[must_use]
    pub fn new(
        controller: ServiceController,
        service_name: impl Into<String>,
        data_directory: impl Into<PathBuf>,
        archive_path: impl Into<PathBuf>,
        metrics: Metrics,
    ) -> Self {
        Self {
            controller,
            service_name: service_name.into(),
            data_directory: data_directory.into(),
            archive_path: archive_path.into(),
            metrics,
        }
    }

    /// Run the restore.
    ///
    /// The archive is verified before the service is touched, and an archive
    /// stored inside the data directory is rejected since the wipe would
    /// delete it. The service is
    /// started again only after a successful unpack; on any later failure it
    /// stays stopped for manual intervention.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub fn run(&self, lease: &NodeLease) -> OpsResult<RestoreSummary> {
        let span = info_span!(
            "restore",
            service = %self.service_name,
            data_directory = %self.data_directory.display(),
            archive = %self.archive_path.display(),
            lease = %lease.path().display()
        );
        let _entered = span.enter();

        let result = self.run_steps();
        self.metrics.record_run(RESTORE, result.is_ok());
        match &result {
            Ok(summary) => info!(
                entries = summary.entries,
                files = summary.files,
                "restore completed"
            ),
            Err(err) => error!(
                error = %err,
                service = %self.service_name,
                "restore aborted"
            ),
        }
        result
    }

    fn run_steps(&self) -> OpsResult<RestoreSummary> {
        let steps = StepRunner::new(RESTORE, &self.metrics);

        steps.execute(StepKind::VerifyArchive, || {
            if archive_inside(&self.archive_path, &self.data_directory) {
                return Err(OpsError::rejected(
                    "archive_inside_data_directory",
                    &self.archive_path,
                ));
            }
            verify_archive(&self.archive_path)
        })?;
        let stopped = steps.execute(StepKind::StopService, || {
            self.controller.stop(&self.service_name)
        })?;
        steps.execute(StepKind::WipeData, || {
            wipe_data_directory(&self.data_directory, &stopped)
        })?;
        let summary = steps.execute(StepKind::RestoreArchive, || {
            restore_from_archive(&self.archive_path, &self.data_directory)
        })?;
        steps.execute(StepKind::StartService, || {
            self.controller.start(&self.service_name)
        })?;
        Ok(summary)
    }
}
