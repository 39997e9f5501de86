//! Service state and error definitions.

use std::fmt;

use thiserror::Error;

/// Run state of the game server as reported by the host service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Unknown,
}

impl ServerState {
    /// Map `systemctl is-active` output.
    pub fn from_systemd(text: &str) -> Self {
        match text.trim() {
            "active" | "reloading" => ServerState::Running,
            "activating" => ServerState::Starting,
            "deactivating" => ServerState::Stopping,
            "inactive" => ServerState::Stopped,
            "failed" => ServerState::Failed,
            _ => ServerState::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == ServerState::Running
    }

    /// States in which the control API may answer.
    pub fn accepts_control(&self) -> bool {
        matches!(self, ServerState::Running | ServerState::Stopping)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Stopped => "stopped",
            ServerState::Failed => "failed",
            ServerState::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Errors from driving the host service manager.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Stopping requires root.
    #[error("Unable to stop game service unless run with sudo")]
    NotPrivileged,

    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}")]
    Failed { command: String, status: String },
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
