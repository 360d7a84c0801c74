//! Argument parsing, bootstrap, and command dispatch.

use std::path::{Path, PathBuf};

use cassvault_config::VaultConfig;
use cassvault_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, init_logging};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::commands::backup::handle_backup;
use crate::commands::config::{handle_config_check, handle_config_show};
use crate::commands::destination::handle_destination;
use crate::commands::restore::handle_restore;
use crate::context::{AppContext, CliError, CliResult};

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let run_id = Uuid::new_v4().to_string();

    match dispatch(cli, &run_id).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli, run_id: &str) -> CliResult<()> {
    let config = cassvault_config::load(cli.config.as_deref())?;
    install_logging(&config)?;
    let _context = GlobalContextGuard::new(cli.command.label(), run_id);

    let ctx = AppContext {
        config,
        output: cli.output,
        metrics_file: cli.metrics_file,
    };

    match cli.command {
        Command::Backup => handle_backup(&ctx).await,
        Command::Restore(args) => handle_restore(&ctx, &args).await,
        Command::Destination(args) => handle_destination(&ctx, &args),
        Command::Config(ConfigCommand::Check) => handle_config_check(&ctx, cli.config.as_deref()),
        Command::Config(ConfigCommand::Show) => handle_config_show(&ctx),
    }
}

fn install_logging(config: &VaultConfig) -> CliResult<()> {
    let logging = LoggingConfig {
        level: &config.telemetry.log_level,
        format: LogFormat::from_setting(config.telemetry.log_format.as_deref()),
        build_sha: option_env!("CASSVAULT_BUILD_SHA").unwrap_or("dev"),
    };
    init_logging(&logging).map_err(CliError::failure)
}

#[derive(Parser)]
#[command(
    name = "cassvault",
    version,
    about = "Snapshot backup and restore for a Cassandra node"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "CASSVAULT_CONFIG",
        help = "YAML configuration file; defaults apply when omitted"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "CASSVAULT_METRICS_FILE",
        help = "Write Prometheus metrics to this textfile after the run"
    )]
    pub(crate) metrics_file: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Snapshot the node and write a fresh backup archive.
    Backup,
    /// Replace the data directory with the backup archive's contents.
    Restore(RestoreArgs),
    /// Print the remote destination key for this node's backups.
    Destination(DestinationArgs),
    /// Inspect the effective configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    const fn label(&self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore(_) => "restore",
            Self::Destination(_) => "destination",
            Self::Config(_) => "config",
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommand {
    /// Load and validate the configuration.
    Check,
    /// Print the effective configuration.
    Show,
}

#[derive(Args)]
pub(crate) struct RestoreArgs {
    #[arg(long, help = "Confirm that the data directory may be wiped")]
    pub(crate) yes: bool,
    #[arg(long, help = "Archive to restore instead of the configured one")]
    pub(crate) archive: Option<PathBuf>,
}

impl RestoreArgs {
    pub(crate) fn archive_path(&self, config: &VaultConfig) -> PathBuf {
        self.archive
            .clone()
            .unwrap_or_else(|| config.archive_path())
    }
}

#[derive(Args)]
pub(crate) struct DestinationArgs {
    #[arg(long, help = "Bucket name; overrides bucket_name from configuration")]
    pub(crate) bucket: Option<String>,
    #[arg(long, help = "Host name; overrides host_name and the OS host name")]
    pub(crate) host: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

/// Absolute path check shared by handlers that accept path flags.
pub(crate) fn require_absolute(flag: &str, path: &Path) -> CliResult<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(CliError::validation(format!(
            "--{flag} must be an absolute path (got {})",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cassvault").chain(args.iter().copied()))
    }

    #[test]
    fn backup_accepts_global_flags_after_subcommand() -> Result<(), clap::Error> {
        let cli = parse(&[
            "backup",
            "--config",
            "/etc/cassvault.yaml",
            "--metrics-file",
            "/var/lib/node_exporter/cassvault.prom",
            "--output",
            "json",
        ])?;
        assert!(matches!(cli.command, Command::Backup));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/cassvault.yaml")));
        assert_eq!(
            cli.metrics_file,
            Some(PathBuf::from("/var/lib/node_exporter/cassvault.prom"))
        );
        assert_eq!(cli.output, OutputFormat::Json);
        Ok(())
    }

    #[test]
    fn restore_defaults_to_unconfirmed_configured_archive() -> Result<(), clap::Error> {
        let cli = parse(&["restore"])?;
        let Command::Restore(args) = cli.command else {
            panic!("expected restore command");
        };
        assert!(!args.yes);
        let config = VaultConfig::default();
        assert_eq!(args.archive_path(&config), config.archive_path());
        Ok(())
    }

    #[test]
    fn restore_accepts_archive_override() -> Result<(), clap::Error> {
        let cli = parse(&["restore", "--yes", "--archive", "/tmp/other.tar.gz"])?;
        let Command::Restore(args) = cli.command else {
            panic!("expected restore command");
        };
        assert!(args.yes);
        assert_eq!(
            args.archive_path(&VaultConfig::default()),
            PathBuf::from("/tmp/other.tar.gz")
        );
        Ok(())
    }

    #[test]
    fn destination_flags_are_optional() -> Result<(), clap::Error> {
        let cli = parse(&["destination", "--bucket", "backups"])?;
        let Command::Destination(args) = cli.command else {
            panic!("expected destination command");
        };
        assert_eq!(args.bucket.as_deref(), Some("backups"));
        assert!(args.host.is_none());
        Ok(())
    }

    #[test]
    fn config_requires_a_subcommand() {
        assert!(parse(&["config"]).is_err());
        assert!(matches!(
            parse(&["config", "show"]).map(|cli| cli.command),
            Ok(Command::Config(ConfigCommand::Show))
        ));
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(parse(&["backup", "--output", "xml"]).is_err());
    }

    #[test]
    fn labels_name_the_subcommand() -> Result<(), clap::Error> {
        assert_eq!(parse(&["backup"])?.command.label(), "backup");
        assert_eq!(parse(&["config", "check"])?.command.label(), "config");
        Ok(())
    }

    #[test]
    fn relative_paths_fail_validation() {
        assert!(require_absolute("archive", Path::new("/tmp/a.tar.gz")).is_ok());
        assert!(matches!(
            require_absolute("archive", Path::new("a.tar.gz")),
            Err(CliError::Validation(message)) if message.contains("--archive")
        ));
    }
}
