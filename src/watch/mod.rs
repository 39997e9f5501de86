//! Watch subsystem.
//!
//! # Data Flow
//! ```text
//! tick
//!     → ServiceManager::status
//!     → not running: forget everything
//!     → just started: StartupCheck (confirm, game_started)
//!     → GameControl::players → diff.rs → player events → Notifier
//! ```
//!
//! # Design Decisions
//! - One task owns the watch state; no locking
//! - A failed player poll changes nothing, the next tick retries

pub mod diff;
pub mod monitor;

pub use diff::{diff, PlayerEvent, WatchState};
pub use monitor::{TickReport, WatchLoop};
