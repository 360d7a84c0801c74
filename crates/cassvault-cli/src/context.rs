//! Shared command context and error types for the CLI.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use cassvault_config::{ConfigError, VaultConfig};
use cassvault_ops::OpsError;
use cassvault_telemetry::Metrics;
use tracing::warn;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Attach the pipeline name and the error's own context fields.
    pub(crate) fn pipeline(action: &str, error: OpsError) -> Self {
        let detail = describe(&error);
        Self::Failure(anyhow::Error::new(error).context(format!("{action} failed: {detail}")))
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::InvalidField {
                field,
                reason,
                value,
            } => {
                let shown = value.map_or_else(String::new, |value| format!(" (got {value:?})"));
                Self::validation(format!("invalid configuration: {field}: {reason}{shown}"))
            }
            other => Self::failure(other),
        }
    }
}

fn describe(error: &OpsError) -> String {
    match error {
        OpsError::ToolLaunch { command, .. } => format!("could not run `{command}`"),
        OpsError::ToolExecution {
            command,
            exit_code,
            stderr,
        } => {
            let code = exit_code.map_or_else(|| "a signal".to_string(), |code| code.to_string());
            if stderr.is_empty() {
                format!("`{command}` exited with {code}")
            } else {
                format!("`{command}` exited with {code}: {stderr}")
            }
        }
        OpsError::ServiceControl {
            service_name,
            action,
            ..
        } => format!("supervisor could not {action} {service_name}"),
        OpsError::Filesystem {
            operation, path, ..
        }
        | OpsError::Archive {
            operation, path, ..
        }
        | OpsError::Restore {
            operation, path, ..
        } => format!("{operation} on {}", path.display()),
        OpsError::WipeRefused { reason, path } | OpsError::RestoreRejected { reason, path } => {
            format!("{reason} ({})", path.display())
        }
        OpsError::Lease { path, .. } => format!(
            "another backup or restore holds {}",
            path.display()
        ),
        OpsError::InvalidInput { field, reason, .. } => format!("{field} {reason}"),
    }
}

/// Configuration and global flags shared by command handlers.
pub(crate) struct AppContext {
    pub(crate) config: VaultConfig,
    pub(crate) output: OutputFormat,
    pub(crate) metrics_file: Option<PathBuf>,
}

impl AppContext {
    /// Write the metrics textfile when requested. Failures are logged only.
    pub(crate) fn publish_metrics(&self, metrics: &Metrics) {
        let Some(path) = &self.metrics_file else {
            return;
        };
        if let Err(err) = metrics.write_textfile(path) {
            warn!(path = %path.display(), error = %err, "failed to write metrics textfile");
        }
    }
}
