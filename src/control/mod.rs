//! Game control API subsystem.
//!
//! # Data Flow
//! ```text
//! caller (shutdown, watch, CLI)
//!     → GameControl trait
//!     → client.rs: run state check → API enabled check → HTTP request
//!     → types.rs payloads, or ControlError
//! ```
//!
//! # Design Decisions
//! - Preconditions fail fast without a network call
//! - One error kind for every transport failure; callers only need a fallback
//! - No retries here; callers poll on their own schedule

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::RemoteControlClient;
pub use types::{ControlError, ControlResult, PlayerSnapshot, ServerInfo};

/// Operations offered by the game server's control API.
#[async_trait]
pub trait GameControl: Send + Sync {
    async fn info(&self) -> ControlResult<ServerInfo>;

    async fn players(&self) -> ControlResult<Vec<PlayerSnapshot>>;

    /// Broadcast a message to everyone in game.
    async fn announce(&self, message: &str) -> ControlResult<()>;

    /// Ask the server to write the world to disk.
    async fn save(&self) -> ControlResult<()>;

    async fn player_count(&self) -> ControlResult<usize> {
        Ok(self.players().await?.len())
    }
}
