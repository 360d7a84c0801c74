//! `cassvault backup`.

use std::sync::Arc;

use anyhow::anyhow;
use cassvault_ops::{BackupPipeline, NodeLease, Nodetool, SnapshotManager};
use cassvault_telemetry::Metrics;

use crate::context::{AppContext, CliError, CliResult};
use crate::output::render_archive_summary;

pub(crate) async fn handle_backup(ctx: &AppContext) -> CliResult<()> {
    let metrics = Metrics::new().map_err(CliError::failure)?;
    let config = ctx.config.clone();
    let pipeline_metrics = metrics.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let lease = NodeLease::acquire(config.lock_path())?;
        let snapshots = SnapshotManager::new(Arc::new(Nodetool::new(&config.admin_tool_path)));
        BackupPipeline::new(
            snapshots,
            &config.data_directory_root,
            config.archive_path(),
            pipeline_metrics,
        )
        .run(&lease)
    })
    .await
    .map_err(|err| CliError::failure(anyhow!("backup task did not complete: {err}")))?;

    ctx.publish_metrics(&metrics);
    let summary = outcome.map_err(|err| CliError::pipeline("backup", err))?;
    render_archive_summary(&summary, ctx.output)
}
