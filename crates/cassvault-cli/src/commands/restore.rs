//! `cassvault restore`.

use std::sync::Arc;

use anyhow::anyhow;
use cassvault_ops::{MonitSupervisor, NodeLease, RestorePipeline, ServiceController};
use cassvault_telemetry::Metrics;

use crate::cli::{RestoreArgs, require_absolute};
use crate::context::{AppContext, CliError, CliResult};
use crate::output::render_restore_summary;

pub(crate) async fn handle_restore(ctx: &AppContext, args: &RestoreArgs) -> CliResult<()> {
    let data_directory = ctx.config.data_directory_root.clone();
    if !args.yes {
        return Err(CliError::validation(format!(
            "restore deletes everything under {} and restarts {}; re-run with --yes to confirm",
            data_directory.display(),
            ctx.config.service_name
        )));
    }
    let archive_path = args.archive_path(&ctx.config);
    require_absolute("archive", &archive_path)?;

    let metrics = Metrics::new().map_err(CliError::failure)?;
    let config = ctx.config.clone();
    let pipeline_metrics = metrics.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let lease = NodeLease::acquire(config.lock_path())?;
        let controller =
            ServiceController::new(Arc::new(MonitSupervisor::new(&config.supervisor_path)));
        RestorePipeline::new(
            controller,
            config.service_name.as_str(),
            data_directory,
            archive_path,
            pipeline_metrics,
        )
        .run(&lease)
    })
    .await
    .map_err(|err| CliError::failure(anyhow!("restore task did not complete: {err}")))?;

    ctx.publish_metrics(&metrics);
    let summary = outcome.map_err(|err| CliError::pipeline("restore", err))?;
    render_restore_summary(&summary, ctx.output)
}
