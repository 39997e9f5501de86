//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Interrupt broadcast → every waiting sequence
//!
//! Startup (startup.rs):
//!     Service running → poll control API (or fixed wait) → game_started
//!
//! Shutdown (shutdown.rs):
//!     Check running → game_stopping → warn players until empty → save → Done
//! ```
//!
//! # Design Decisions
//! - Waits are cooperative: an interrupt is honoured between steps
//! - Control API failures degrade the sequence, they never abort it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{ShutdownOrchestrator, ShutdownOutcome, ShutdownPhase};
pub use signals::Interrupt;
pub use startup::{StartupCheck, StartupOutcome};
