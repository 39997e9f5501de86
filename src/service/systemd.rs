//! systemd-backed service handle.
//!
//! Every call re-invokes `systemctl`; nothing is cached.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::service::types::{ServerState, ServiceError, ServiceResult, StartOutcome};
use crate::service::ServiceManager;

#[derive(Debug, Clone)]
pub struct Systemd {
    unit: String,
    program: PathBuf,
    privileged: bool,
}

impl Systemd {
    /// Handle for `unit`, privileged when running as root.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            program: PathBuf::from("systemctl"),
            privileged: nix::unistd::geteuid().is_root(),
        }
    }

    /// Use a different `systemctl` binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_privilege(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn describe(&self, verb: &str) -> String {
        format!("{} {} {}", self.program.display(), verb, self.unit)
    }

    /// Run a query verb and return its trimmed stdout.
    async fn query(&self, verb: &str) -> Option<String> {
        let output = Command::new(&self.program)
            .arg(verb)
            .arg(&self.unit)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => Some(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            Err(e) => {
                tracing::warn!(command = %self.describe(verb), error = %e, "Service query failed");
                None
            }
        }
    }

    async fn command(&self, verb: &str) -> ServiceResult<()> {
        let command = self.describe(verb);
        tracing::debug!(command = %command, "Running service command");

        let status = Command::new(&self.program)
            .arg(verb)
            .arg(&self.unit)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| ServiceError::Spawn {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ServiceError::Failed {
                command,
                status: status.to_string(),
            })
        }
    }
}

#[async_trait]
impl ServiceManager for Systemd {
    async fn status(&self) -> ServerState {
        self.query("is-active")
            .await
            .map(|text| ServerState::from_systemd(&text))
            .unwrap_or(ServerState::Unknown)
    }

    async fn is_enabled(&self) -> bool {
        self.query("is-enabled").await.as_deref() == Some("enabled")
    }

    async fn enable(&self) -> ServiceResult<()> {
        self.command("enable").await
    }

    async fn disable(&self) -> ServiceResult<()> {
        self.command("disable").await
    }

    async fn start(&self) -> ServiceResult<StartOutcome> {
        if self.status().await.is_running() {
            tracing::info!(unit = %self.unit, "Game is currently running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        tracing::info!(unit = %self.unit, "Starting game via systemd");
        self.command("start").await?;
        Ok(StartOutcome::Started)
    }

    async fn stop(&self) -> ServiceResult<()> {
        if !self.privileged {
            return Err(ServiceError::NotPrivileged);
        }
        tracing::info!(unit = %self.unit, "Stopping game via systemd");
        self.command("stop").await
    }
}
