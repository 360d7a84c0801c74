//! Ordered backup and restore pipelines.
//!
//! # Design
//! - Steps run strictly in order; the first failure aborts the run.
//! - Every step transition is logged and counted as
//!   `pipeline_steps_total{pipeline, step, status}`.
//! - Each run ends with one `pipeline_runs_total` sample.

mod backup;
mod restore;

use std::path::Path;
use std::time::Instant;

use cassvault_telemetry::Metrics;
use tracing::{error, info, warn};

use crate::error::OpsResult;

pub use backup::BackupPipeline;
pub use restore::RestorePipeline;

const BACKUP: &str = "backup";
const RESTORE: &str = "restore";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    ClearSnapshots,
    CreateSnapshot,
    CollectFiles,
    CreateArchive,
    VerifyArchive,
    StopService,
    WipeData,
    RestoreArchive,
    StartService,
}

impl StepKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::ClearSnapshots => "clear_snapshots",
            Self::CreateSnapshot => "create_snapshot",
            Self::CollectFiles => "collect_files",
            Self::CreateArchive => "create_archive",
            Self::VerifyArchive => "verify_archive",
            Self::StopService => "stop_service",
            Self::WipeData => "wipe_data",
            Self::RestoreArchive => "restore_archive",
            Self::StartService => "start_service",
        }
    }

    /// Steps that take the database offline or destroy data.
    const fn destructive(self) -> bool {
        matches!(self, Self::StopService | Self::WipeData | Self::RestoreArchive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepStatus {
    Started,
    Completed,
    Failed,
}

impl StepStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Runs pipeline steps with uniform logging and step counters.
struct StepRunner<'a> {
    pipeline: &'static str,
    metrics: &'a Metrics,
}

impl<'a> StepRunner<'a> {
    const fn new(pipeline: &'static str, metrics: &'a Metrics) -> Self {
        Self { pipeline, metrics }
    }

    fn execute<T, F>(&self, step: StepKind, op: F) -> OpsResult<T>
    where
        F: FnOnce() -> OpsResult<T>,
    {
        if step.destructive() {
            warn!(pipeline = self.pipeline, step = step.as_str(), "step started");
        } else {
            info!(pipeline = self.pipeline, step = step.as_str(), "step started");
        }
        self.record(step, StepStatus::Started);
        let started = Instant::now();

        match op() {
            Ok(value) => {
                self.record(step, StepStatus::Completed);
                info!(
                    pipeline = self.pipeline,
                    step = step.as_str(),
                    elapsed_ms = elapsed_ms(started),
                    "step completed"
                );
                Ok(value)
            }
            Err(err) => {
                self.record(step, StepStatus::Failed);
                error!(
                    pipeline = self.pipeline,
                    step = step.as_str(),
                    elapsed_ms = elapsed_ms(started),
                    error = %err,
                    detail = ?err,
                    "step failed"
                );
                Err(err)
            }
        }
    }

    fn record(&self, step: StepKind, status: StepStatus) {
        self.metrics
            .inc_pipeline_step(self.pipeline, step.as_str(), status.as_str());
    }
}

/// True when `archive_path` lies inside `data_directory`, where a wipe or a
/// snapshot cleanup would destroy it.
fn archive_inside(archive_path: &Path, data_directory: &Path) -> bool {
    archive_path.starts_with(data_directory)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
