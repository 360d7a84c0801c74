//! `cassvault config check|show`.

use std::path::Path;

use crate::context::{AppContext, CliResult};
use crate::output::{ConfigCheckView, render_config, render_config_check};

/// Loading already validated the configuration; report where it came from.
pub(crate) fn handle_config_check(ctx: &AppContext, source: Option<&Path>) -> CliResult<()> {
    let view = ConfigCheckView {
        source,
        archive: ctx.config.archive_path(),
        lock: ctx.config.lock_path(),
    };
    render_config_check(&view, ctx.output)
}

pub(crate) fn handle_config_show(ctx: &AppContext) -> CliResult<()> {
    render_config(&ctx.config, ctx.output)
}
