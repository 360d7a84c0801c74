//! Fake admin tool and supervisor sharing one ordered call log.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use cassvault_ops::{
    AdminCommand, AdminTool, OpsError, OpsResult, ServiceAction, Supervisor, SupervisorError,
};
use walkdir::WalkDir;

/// External call observed by a fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Admin tool command.
    Admin(AdminCommand),
    /// Supervisor stop request for a service.
    Stop(String),
    /// Supervisor start request for a service.
    Start(String),
}

/// Ordered record of calls shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Calls recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any start request was recorded.
    #[must_use]
    pub fn started(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| matches!(call, Call::Start(_)))
    }
}

/// Admin tool double that records calls and mimics `nodetool` effects.
///
/// `clearsnapshot` removes every `snapshots` directory under the data
/// directory; `snapshot` writes the configured files.
#[derive(Debug, Clone)]
pub struct FakeAdminTool {
    log: CallLog,
    data_directory: PathBuf,
    snapshot_files: Vec<(String, Vec<u8>)>,
    fail_on: Option<AdminCommand>,
}

impl FakeAdminTool {
    /// Fake operating on `data_directory`.
    #[must_use]
    pub fn new(log: CallLog, data_directory: impl Into<PathBuf>) -> Self {
        Self {
            log,
            data_directory: data_directory.into(),
            snapshot_files: Vec::new(),
            fail_on: None,
        }
    }

    /// File written (relative to the data directory) by each `snapshot`.
    #[must_use]
    pub fn with_snapshot_file(mut self, relative: &str, contents: &[u8]) -> Self {
        self.snapshot_files
            .push((relative.to_string(), contents.to_vec()));
        self
    }

    /// Make `command` fail with a non-zero exit.
    #[must_use]
    pub const fn failing_on(mut self, command: AdminCommand) -> Self {
        self.fail_on = Some(command);
        self
    }

    fn clear(&self) -> std::io::Result<()> {
        if !self.data_directory.exists() {
            return Ok(());
        }
        let mut doomed = Vec::new();
        for entry in WalkDir::new(&self.data_directory) {
            let entry = entry?;
            if entry.file_type().is_dir() && entry.file_name() == "snapshots" {
                doomed.push(entry.into_path());
            }
        }
        for directory in doomed {
            fs::remove_dir_all(directory)?;
        }
        Ok(())
    }

    fn snapshot(&self) -> std::io::Result<()> {
        for (relative, contents) in &self.snapshot_files {
            let path = self.data_directory.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, contents)?;
        }
        Ok(())
    }
}

impl AdminTool for FakeAdminTool {
    fn run(&self, command: AdminCommand) -> OpsResult<()> {
        self.log.push(Call::Admin(command));
        if self.fail_on == Some(command) {
            return Err(execution_error(command, "injected failure"));
        }
        let effect = match command {
            AdminCommand::ClearSnapshot => self.clear(),
            AdminCommand::Snapshot => self.snapshot(),
        };
        effect.map_err(|err| execution_error(command, &err.to_string()))
    }
}

fn execution_error(command: AdminCommand, stderr: &str) -> OpsError {
    OpsError::ToolExecution {
        command: format!("nodetool {}", command.as_str()),
        exit_code: Some(2),
        stderr: stderr.to_string(),
    }
}

type Hook = Arc<dyn Fn(&Path) + Send + Sync>;

/// Supervisor double that records calls and can fail or run a hook on stop.
#[derive(Clone)]
pub struct FakeSupervisor {
    log: CallLog,
    fail_on: Option<ServiceAction>,
    on_stop: Option<(PathBuf, Hook)>,
}

impl FakeSupervisor {
    /// Supervisor that acknowledges every request.
    #[must_use]
    pub const fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_on: None,
            on_stop: None,
        }
    }

    /// Make `action` fail after it is recorded.
    #[must_use]
    pub const fn failing_on(mut self, action: ServiceAction) -> Self {
        self.fail_on = Some(action);
        self
    }

    /// Run `hook(path)` when a stop succeeds, e.g. to tamper with the archive
    /// between verification and unpacking.
    #[must_use]
    pub fn on_stop(
        mut self,
        path: impl Into<PathBuf>,
        hook: impl Fn(&Path) + Send + Sync + 'static,
    ) -> Self {
        self.on_stop = Some((path.into(), Arc::new(hook)));
        self
    }

    fn respond(&self, action: ServiceAction) -> Result<(), SupervisorError> {
        if self.fail_on == Some(action) {
            return Err(format!("monit: {action} request refused").into());
        }
        Ok(())
    }
}

impl Supervisor for FakeSupervisor {
    fn stop(&self, service_name: &str) -> Result<(), SupervisorError> {
        self.log.push(Call::Stop(service_name.to_string()));
        self.respond(ServiceAction::Stop)?;
        if let Some((path, hook)) = &self.on_stop {
            hook(path);
        }
        Ok(())
    }

    fn start(&self, service_name: &str) -> Result<(), SupervisorError> {
        self.log.push(Call::Start(service_name.to_string()));
        self.respond(ServiceAction::Start)
    }
}
