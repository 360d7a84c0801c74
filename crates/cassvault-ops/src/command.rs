//! Blocking subprocess runner shared by the admin tool and supervisor clients.

use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Number of trailing stderr lines kept on failure.
const STDERR_TAIL_LINES: usize = 20;

/// Failure to run an external command to successful completion.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be spawned.
    #[error("command could not be launched")]
    Launch {
        /// Rendered command line.
        command: String,
        /// Underlying spawn error.
        source: io::Error,
    },
    /// The process exited with a non-zero status.
    #[error("command exited unsuccessfully")]
    Exit {
        /// Rendered command line.
        command: String,
        /// Exit status when the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Trailing stderr output.
        stderr: String,
    },
}

/// Run `program args..`, wait for it, and require a zero exit status.
pub(crate) fn run(program: &Path, args: &[&str]) -> Result<(), CommandError> {
    let command = render(program, args);
    debug!(command = %command, "running external command");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| CommandError::Launch {
            command: command.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        command = %command,
        stdout = %stdout.trim_end(),
        stderr = %stderr.trim_end(),
        "external command output"
    );

    if output.status.success() {
        debug!(command = %command, "external command succeeded");
        return Ok(());
    }

    Err(CommandError::Exit {
        command,
        exit_code: output.status.code(),
        stderr: tail(&stderr),
    })
}

fn render(program: &Path, args: &[&str]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

fn tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn successful_command_returns_ok() -> Result<(), Box<dyn std::error::Error>> {
        run(Path::new("true"), &["snapshot"])?;
        Ok(())
    }

    #[test]
    fn non_zero_exit_reports_code_and_stderr() -> Result<(), Box<dyn std::error::Error>> {
        let err = run(
            Path::new("/bin/sh"),
            &["-c", "echo 'connection refused' >&2; exit 3"],
        )
        .err()
        .ok_or_else(|| io::Error::other("expected failure"))?;
        match err {
            CommandError::Exit {
                command,
                exit_code,
                stderr,
            } => {
                assert!(command.starts_with("/bin/sh -c"));
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "connection refused");
            }
            CommandError::Launch { .. } => return Err("expected exit error".into()),
        }
        Ok(())
    }

    #[test]
    fn missing_binary_is_a_launch_error() -> Result<(), Box<dyn std::error::Error>> {
        let temp = tempfile::tempdir()?;
        let err = run(&temp.path().join("absent"), &[])
            .err()
            .ok_or_else(|| io::Error::other("expected failure"))?;
        assert!(matches!(err, CommandError::Launch { .. }));
        Ok(())
    }

    #[test]
    fn tail_keeps_the_last_lines() {
        let long: String = (0..30).map(|line| format!("line {line}\n")).collect();
        let kept = tail(&long);
        assert_eq!(kept.lines().count(), STDERR_TAIL_LINES);
        assert!(kept.starts_with("line 10"));
        assert!(kept.ends_with("line 29"));
    }
}
