//! `cassvault destination`.

use cassvault_ops::{backup_destination_path, local_host_name};

use crate::cli::DestinationArgs;
use crate::context::{AppContext, CliError, CliResult};
use crate::output::{DestinationView, render_destination};

pub(crate) fn handle_destination(ctx: &AppContext, args: &DestinationArgs) -> CliResult<()> {
    let bucket = args
        .bucket
        .as_deref()
        .or(ctx.config.bucket_name.as_deref())
        .ok_or_else(|| {
            CliError::validation(
                "bucket name is required (pass --bucket, set CASSVAULT_BUCKET, or configure bucket_name)",
            )
        })?;
    check_segment("bucket", bucket)?;

    let host = match args.host.as_deref().or(ctx.config.host_name.as_deref()) {
        Some(host) => host.to_string(),
        None => local_host_name(),
    };
    check_segment("host", &host)?;

    let view = DestinationView {
        bucket,
        host: &host,
        destination: backup_destination_path(bucket, &host),
    };
    render_destination(&view, ctx.output)
}

fn check_segment(flag: &str, value: &str) -> CliResult<()> {
    if value.trim().is_empty() {
        return Err(CliError::validation(format!("--{flag} cannot be empty")));
    }
    if value.contains('/') {
        return Err(CliError::validation(format!(
            "--{flag} must not contain '/' (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use cassvault_config::VaultConfig;

    fn context(bucket: Option<&str>) -> AppContext {
        AppContext {
            config: VaultConfig {
                bucket_name: bucket.map(str::to_string),
                ..VaultConfig::default()
            },
            output: OutputFormat::Table,
            metrics_file: None,
        }
    }

    #[test]
    fn missing_bucket_is_a_validation_error() {
        let args = DestinationArgs {
            bucket: None,
            host: Some("node-1".to_string()),
        };
        assert!(matches!(
            handle_destination(&context(None), &args),
            Err(CliError::Validation(_))
        ));
    }

    #[test]
    fn flag_overrides_configured_bucket() {
        let args = DestinationArgs {
            bucket: Some("flag-bucket".to_string()),
            host: Some("node-1".to_string()),
        };
        assert!(handle_destination(&context(Some("config-bucket")), &args).is_ok());
    }

    #[test]
    fn slashes_are_rejected() {
        assert!(check_segment("host", "a/b").is_err());
        assert!(check_segment("bucket", " ").is_err());
        assert!(check_segment("bucket", "backups").is_ok());
    }
}
