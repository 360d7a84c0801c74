//! Output renderers and formatting helpers for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use cassvault_config::VaultConfig;
use cassvault_ops::{ArchiveSummary, RestoreSummary};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

/// Destination key with the inputs it was derived from.
#[derive(Debug, Serialize)]
pub(crate) struct DestinationView<'a> {
    pub(crate) bucket: &'a str,
    pub(crate) host: &'a str,
    pub(crate) destination: String,
}

/// Result of `config check`.
#[derive(Debug, Serialize)]
pub(crate) struct ConfigCheckView<'a> {
    pub(crate) source: Option<&'a Path>,
    pub(crate) archive: PathBuf,
    pub(crate) lock: PathBuf,
}

pub(crate) fn render_archive_summary(summary: &ArchiveSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Table => {
            println!("archive: {}", summary.path.display());
            println!("files: {}", summary.files);
            println!("directories: {}", summary.directories);
            println!("size: {}", format_bytes(summary.bytes));
            println!("created: {}", summary.created_at.to_rfc3339());
        }
    }
    Ok(())
}

pub(crate) fn render_restore_summary(summary: &RestoreSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(summary)?,
        OutputFormat::Table => {
            println!("archive: {}", summary.archive.display());
            if let Some(target) = &summary.target {
                println!("restored into: {}", target.display());
            }
            println!("entries: {}", summary.entries);
            println!("files: {}", summary.files);
        }
    }
    Ok(())
}

pub(crate) fn render_destination(view: &DestinationView<'_>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(view)?,
        OutputFormat::Table => println!("{}", view.destination),
    }
    Ok(())
}

pub(crate) fn render_config(config: &VaultConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            let text = serde_yaml::to_string(config)
                .map_err(|err| CliError::failure(anyhow!("failed to format YAML: {err}")))?;
            print!("{text}");
        }
    }
    Ok(())
}

pub(crate) fn render_config_check(view: &ConfigCheckView<'_>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(view)?,
        OutputFormat::Table => {
            match view.source {
                Some(path) => println!("configuration ok ({})", path.display()),
                None => println!("configuration ok (defaults and environment)"),
            }
            println!("archive: {}", view.archive.display());
            println!("lock: {}", view.lock.display());
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
