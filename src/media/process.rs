//! External process execution
//!
//! Every call to `ffprobe`/`ffmpeg` goes through [`CommandRunner`] so the
//! pipeline can be driven by a fake in tests.

use async_trait::async_trait;
use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::metrics;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Required command {0} not found, make sure it exists in $PATH")]
    NotFound(String),

    #[error("Cannot run command {0} due to invalid permissions on binary")]
    PermissionDenied(String),

    #[error("{0} timed out")]
    Timeout(String),

    #[error("{command} failed with {status}")]
    Status {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Failed to run {0}")]
    Io(String, #[source] std::io::Error),
}

impl ProcessError {
    /// Short machine-readable reason, used as a metrics label
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::PermissionDenied(_) => "permission-denied",
            Self::Timeout(_) => "timeout",
            Self::Status { .. } => "failure",
            Self::Io(_, _) => "io",
        }
    }

    fn from_spawn(command: &str, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(command.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(command.to_string()),
            _ => Self::Io(command.to_string(), e),
        }
    }
}

/// Runs a program to completion and returns its stdout
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<Vec<u8>, ProcessError>;
}

/// Spawns real child processes with `tokio::process`
#[derive(Debug, Clone)]
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    #[tracing::instrument(level = "debug", skip(self, args), fields(timeout = ?self.timeout))]
    async fn run(&self, program: &str, args: &[OsString]) -> Result<Vec<u8>, ProcessError> {
        let start = Instant::now();
        let result = self.spawn_and_wait(program, args).await;

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_process(program, status, start.elapsed().as_secs_f64());

        result
    }
}

impl SystemCommandRunner {
    async fn spawn_and_wait(
        &self,
        program: &str,
        args: &[OsString],
    ) -> Result<Vec<u8>, ProcessError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::from_spawn(program, e))?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| ProcessError::Io(program.to_string(), e))?,
            Err(_) => {
                tracing::warn!(command = %program, timeout = ?self.timeout, "Process timed out");
                return Err(ProcessError::Timeout(program.to_string()));
            }
        };

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(command = %program, status = %output.status, %stderr, "Process exited unsuccessfully");
        Err(ProcessError::Status {
            command: program.to_string(),
            status: output.status,
            stderr,
        })
    }
}
