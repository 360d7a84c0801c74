//! Database service control through the process supervisor.
//!
//! # Design
//! - `Supervisor` is the seam; `MonitSupervisor` is the production client.
//! - A successful stop yields a [`ServiceStopped`] token. Destructive steps
//!   take the token, so they cannot run before the service is down.
//! - Start is unconditional so operators can bring a node back by hand after
//!   an aborted restore.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::command;
use crate::error::{OpsError, OpsResult};

/// Error type returned by supervisor implementations.
pub type SupervisorError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle requests sent to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    /// Stop the watched process and keep it down.
    Stop,
    /// Start the watched process.
    Start,
}

impl ServiceAction {
    /// Action name as passed to the supervisor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process supervisor able to stop and start a watched service.
///
/// Both calls block until the supervisor has acknowledged the request.
pub trait Supervisor: Send + Sync {
    /// Stop `service_name`.
    ///
    /// # Errors
    ///
    /// Returns the supervisor's failure unchanged.
    fn stop(&self, service_name: &str) -> Result<(), SupervisorError>;

    /// Start `service_name`.
    ///
    /// # Errors
    ///
    /// Returns the supervisor's failure unchanged.
    fn start(&self, service_name: &str) -> Result<(), SupervisorError>;
}

/// Supervisor client driving `monit`.
#[derive(Debug, Clone)]
pub struct MonitSupervisor {
    binary: PathBuf,
    group: bool,
}

impl MonitSupervisor {
    /// Drive the `monit` executable at `binary`, addressing a single watch.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            group: false,
        }
    }

    /// Treat service names as watch groups (`monit <action> -g <name>`).
    #[must_use]
    pub const fn watch_group(mut self) -> Self {
        self.group = true;
        self
    }

    /// Executable path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn request(&self, action: ServiceAction, service_name: &str) -> Result<(), SupervisorError> {
        let mut args = vec![action.as_str()];
        if self.group {
            args.push("-g");
        }
        args.push(service_name);
        command::run(&self.binary, &args).map_err(Into::into)
    }
}

impl Supervisor for MonitSupervisor {
    fn stop(&self, service_name: &str) -> Result<(), SupervisorError> {
        self.request(ServiceAction::Stop, service_name)
    }

    fn start(&self, service_name: &str) -> Result<(), SupervisorError> {
        self.request(ServiceAction::Start, service_name)
    }
}

/// Proof that the supervisor acknowledged a stop request.
///
/// Only [`ServiceController::stop`] creates one.
#[derive(Debug)]
#[must_use = "destructive steps require the stop acknowledgement"]
pub struct ServiceStopped {
    service_name: String,
}

impl ServiceStopped {
    /// Service that was stopped.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Stops and starts the database service through a [`Supervisor`].
#[derive(Clone)]
pub struct ServiceController {
    supervisor: Arc<dyn Supervisor>,
}

impl ServiceController {
    /// Control services through `supervisor`.
    #[must_use]
    pub fn new(supervisor: Arc<dyn Supervisor>) -> Self {
        Self { supervisor }
    }

    /// Ask the supervisor to stop `service_name`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::ServiceControl`] when the supervisor fails.
    pub fn stop(&self, service_name: &str) -> OpsResult<ServiceStopped> {
        warn!(service = service_name, "stopping database service");
        self.supervisor
            .stop(service_name)
            .map_err(|source| control_error(service_name, ServiceAction::Stop, source))?;
        info!(service = service_name, "database service stopped");
        Ok(ServiceStopped {
            service_name: service_name.to_string(),
        })
    }

    /// Ask the supervisor to start `service_name`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::ServiceControl`] when the supervisor fails.
    pub fn start(&self, service_name: &str) -> OpsResult<()> {
        self.supervisor
            .start(service_name)
            .map_err(|source| control_error(service_name, ServiceAction::Start, source))?;
        info!(service = service_name, "database service started");
        Ok(())
    }
}

fn control_error(service_name: &str, action: ServiceAction, source: SupervisorError) -> OpsError {
    OpsError::ServiceControl {
        service_name: service_name.to_string(),
        action: action.as_str(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    struct Scripted {
        calls: Mutex<Vec<String>>,
        fail_stop: bool,
    }

    impl Scripted {
        fn new(fail_stop: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_stop,
            })
        }

        fn record(&self, entry: String) -> Result<(), SupervisorError> {
            self.calls
                .lock()
                .map_err(|_| io::Error::other("poisoned"))?
                .push(entry);
            Ok(())
        }
    }

    impl Supervisor for Scripted {
        fn stop(&self, service_name: &str) -> Result<(), SupervisorError> {
            self.record(format!("stop {service_name}"))?;
            if self.fail_stop {
                return Err(io::Error::other("monit: cannot connect").into());
            }
            Ok(())
        }

        fn start(&self, service_name: &str) -> Result<(), SupervisorError> {
            self.record(format!("start {service_name}"))
        }
    }

    #[test]
    fn stop_yields_token_for_the_service() -> Result<(), Box<dyn std::error::Error>> {
        let supervisor = Scripted::new(false);
        let controller = ServiceController::new(supervisor.clone());

        let stopped = controller.stop("cassandra-9999")?;
        controller.start("cassandra-9999")?;

        assert_eq!(stopped.service_name(), "cassandra-9999");
        let calls = supervisor.calls.lock().map_err(|_| "poisoned")?.clone();
        assert_eq!(calls, vec!["stop cassandra-9999", "start cassandra-9999"]);
        Ok(())
    }

    #[test]
    fn stop_failure_carries_service_and_action() {
        let controller = ServiceController::new(Scripted::new(true));
        let err = controller.stop("cassandra-9999");
        assert!(matches!(
            err,
            Err(OpsError::ServiceControl {
                action: "stop",
                ref service_name,
                ..
            }) if service_name == "cassandra-9999"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn monit_client_reports_non_zero_exit() {
        let monit = MonitSupervisor::new("false");
        let err = monit.stop("cassandra-9999");
        let rendered = err.map_err(|err| err.to_string());
        assert_eq!(
            rendered,
            Err("command exited unsuccessfully".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn monit_client_accepts_zero_exit() {
        let monit = MonitSupervisor::new("true").watch_group();
        assert!(monit.start("cassandra-9999").is_ok());
        assert_eq!(monit.binary(), Path::new("true"));
    }

    #[test]
    fn action_names_match_monit_verbs() {
        assert_eq!(ServiceAction::Stop.to_string(), "stop");
        assert_eq!(ServiceAction::Start.as_str(), "start");
    }
}
