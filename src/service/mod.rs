//! Host service subsystem.
//!
//! # Responsibilities
//! - Report the game server's run state
//! - Start, stop, enable and disable the host-managed unit
//!
//! # Design Decisions
//! - Stateless: every query asks the host service manager again
//! - Stop is refused up front for unprivileged callers
//! - The trait is the seam the shutdown and watch logic are tested through

pub mod systemd;
pub mod types;

use async_trait::async_trait;

pub use systemd::Systemd;
pub use types::{ServerState, ServiceError, ServiceResult, StartOutcome};

/// Query and command surface over the host-managed game process.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    /// Current run state; `Unknown` when the host cannot be queried.
    async fn status(&self) -> ServerState;

    /// Whether the unit starts on boot.
    async fn is_enabled(&self) -> bool;

    async fn enable(&self) -> ServiceResult<()>;

    async fn disable(&self) -> ServiceResult<()>;

    /// Start the unit; a no-op when it is already running.
    async fn start(&self) -> ServiceResult<StartOutcome>;

    /// Stop the unit. Requires elevated privileges.
    async fn stop(&self) -> ServiceResult<()>;

    /// Stop then start. `false` when the unit was not running.
    async fn restart(&self) -> ServiceResult<bool> {
        if !self.status().await.is_running() {
            return Ok(false);
        }
        self.stop().await?;
        self.start().await?;
        Ok(true)
    }
}
