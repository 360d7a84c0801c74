//! Snapshot management through the database admin tool.
//!
//! # Design
//! - The admin tool is a trait so pipelines can run against a fake in tests.
//! - `Nodetool` shells out once per command and waits for it to exit.
//! - No retries: a failed command aborts the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::command::{self, CommandError};
use crate::error::{OpsError, OpsResult};

/// Admin tool sub-commands used by the backup pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    /// Remove every existing snapshot on the node.
    ClearSnapshot,
    /// Take a new snapshot of every keyspace.
    Snapshot,
}

impl AdminCommand {
    /// Sub-command name as passed to the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClearSnapshot => "clearsnapshot",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Runs admin commands against the local database node.
pub trait AdminTool: Send + Sync {
    /// Execute `command` and block until the tool exits.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::ToolLaunch`] when the tool cannot be started and
    /// [`OpsError::ToolExecution`] when it reports failure.
    fn run(&self, command: AdminCommand) -> OpsResult<()>;
}

/// `nodetool` binary on the local host.
#[derive(Debug, Clone)]
pub struct Nodetool {
    binary: PathBuf,
}

impl Nodetool {
    /// Use the `nodetool` executable at `binary`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Executable path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl AdminTool for Nodetool {
    fn run(&self, command: AdminCommand) -> OpsResult<()> {
        command::run(&self.binary, &[command.as_str()]).map_err(|err| match err {
            CommandError::Launch { command, source } => OpsError::ToolLaunch { command, source },
            CommandError::Exit {
                command,
                exit_code,
                stderr,
            } => OpsError::ToolExecution {
                command,
                exit_code,
                stderr,
            },
        })
    }
}

/// Clears and creates node snapshots.
#[derive(Clone)]
pub struct SnapshotManager {
    tool: Arc<dyn AdminTool>,
}

impl SnapshotManager {
    /// Manage snapshots through `tool`.
    #[must_use]
    pub fn new(tool: Arc<dyn AdminTool>) -> Self {
        Self { tool }
    }

    /// Remove all existing snapshots. Succeeds when there are none.
    ///
    /// # Errors
    ///
    /// Propagates the admin tool failure.
    pub fn clear_snapshots(&self) -> OpsResult<()> {
        self.tool.run(AdminCommand::ClearSnapshot)?;
        info!("cleared existing snapshots");
        Ok(())
    }

    /// Take a fresh snapshot of every keyspace.
    ///
    /// # Errors
    ///
    /// Propagates the admin tool failure.
    pub fn create_snapshot(&self) -> OpsResult<()> {
        self.tool.run(AdminCommand::Snapshot)?;
        info!("created snapshot");
        Ok(())
    }
}
