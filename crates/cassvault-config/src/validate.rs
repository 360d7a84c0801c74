//! Validation of a fully merged configuration.

use std::path::{Component, Path};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{TelemetryConfig, VaultConfig};

const LOG_FORMATS: &[&str] = &["json", "pretty"];

/// Check every field of a merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails.
pub fn validate(config: &VaultConfig) -> ConfigResult<()> {
    validate_directory("data_directory_root", &config.data_directory_root)?;
    validate_directory("backup_directory", &config.backup_directory)?;

    if config
        .backup_directory
        .starts_with(&config.data_directory_root)
        || config
            .data_directory_root
            .starts_with(&config.backup_directory)
    {
        return Err(ConfigError::invalid(
            "backup_directory",
            "overlaps_data_directory",
            config.backup_directory.display(),
        ));
    }

    validate_file_name(&config.archive_file_name)?;
    validate_service_name(&config.service_name)?;
    validate_binary("admin_tool_path", &config.admin_tool_path)?;
    validate_binary("supervisor_path", &config.supervisor_path)?;

    if let Some(bucket) = config.bucket_name.as_deref() {
        validate_segment("bucket_name", bucket)?;
    }
    if let Some(host) = config.host_name.as_deref() {
        validate_segment("host_name", host)?;
    }

    validate_telemetry(&config.telemetry)
}

fn validate_directory(field: &'static str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(field, "empty", ""));
    }
    if !path.is_absolute() {
        return Err(ConfigError::invalid(field, "not_absolute", path.display()));
    }
    if path.components().all(|c| matches!(c, Component::RootDir)) {
        return Err(ConfigError::invalid(field, "filesystem_root", path.display()));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ConfigError::invalid(field, "parent_segment", path.display()));
    }
    Ok(())
}

fn validate_file_name(name: &str) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::invalid("archive_file_name", "empty", name));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ConfigError::invalid(
            "archive_file_name",
            "not_a_file_name",
            name,
        )),
    }
}

fn validate_service_name(name: &str) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::invalid("service_name", "empty", name));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid("service_name", "whitespace", name));
    }
    Ok(())
}

fn validate_binary(field: &'static str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(field, "empty", ""));
    }
    Ok(())
}

fn validate_segment(field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "empty", value));
    }
    if value.contains('/') {
        return Err(ConfigError::invalid(field, "contains_separator", value));
    }
    Ok(())
}

fn validate_telemetry(telemetry: &TelemetryConfig) -> ConfigResult<()> {
    if telemetry.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "telemetry.log_level",
            "empty",
            &telemetry.log_level,
        ));
    }
    if let Some(format) = telemetry.log_format.as_deref()
        && !LOG_FORMATS.contains(&format)
    {
        return Err(ConfigError::invalid(
            "telemetry.log_format",
            "unsupported",
            format,
        ));
    }
    Ok(())
}
