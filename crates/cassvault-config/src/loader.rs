//! Configuration loading: defaults, then an optional YAML file, then
//! `CASSVAULT_*` environment overrides, then validation.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::VaultConfig;
use crate::validate::validate;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "CASSVAULT_";

/// Load configuration using the process environment for overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the merged
/// configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<VaultConfig> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an injectable environment lookup.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the merged
/// configuration fails validation.
pub fn load_with_env<F>(path: Option<&Path>, env: F) -> ConfigResult<VaultConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => VaultConfig::default(),
    };
    apply_env(&mut config, env);
    validate(&config)?;
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<VaultConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded configuration file");
    if raw.trim().is_empty() {
        return Ok(VaultConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env<F>(config: &mut VaultConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |suffix: &str| {
        env(&format!("{ENV_PREFIX}{suffix}")).filter(|value| !value.trim().is_empty())
    };

    if let Some(value) = lookup("DATA_DIR") {
        config.data_directory_root = PathBuf::from(value);
    }
    if let Some(value) = lookup("BACKUP_DIR") {
        config.backup_directory = PathBuf::from(value);
    }
    if let Some(value) = lookup("ARCHIVE_NAME") {
        config.archive_file_name = value;
    }
    if let Some(value) = lookup("SERVICE_NAME") {
        config.service_name = value;
    }
    if let Some(value) = lookup("ADMIN_TOOL") {
        config.admin_tool_path = PathBuf::from(value);
    }
    if let Some(value) = lookup("SUPERVISOR") {
        config.supervisor_path = PathBuf::from(value);
    }
    if let Some(value) = lookup("BUCKET") {
        config.bucket_name = Some(value);
    }
    if let Some(value) = lookup("HOSTNAME") {
        config.host_name = Some(value);
    }
    if let Some(value) = lookup("LOG_LEVEL") {
        config.telemetry.log_level = value;
    }
    if let Some(value) = lookup("LOG_FORMAT") {
        config.telemetry.log_format = Some(value);
    }
}
