//! Graceful shutdown of the game server.
//!
//! # State Machine
//! ```text
//! Idle → Checking ──not running──→ Aborted
//!           │
//!           ▼
//!      Announcing → Waiting ──players gone / API down / countdown over──→ Saving → Done
//!                      │
//!                      └──interrupt──→ Cancelled
//! ```
//!
//! The orchestrator never stops the service itself. It runs before the host
//! service manager stops the process and reports whether that is safe.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::ShutdownConfig;
use crate::control::GameControl;
use crate::lifecycle::signals::{interruptible_sleep, interrupted};
use crate::notifications::{notify_best_effort, NotificationEvent, Notifier};
use crate::service::ServiceManager;

/// In-game broadcast when a countdown is abandoned.
pub const CANCELLED_MESSAGE: &str = "Server shutdown cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Idle,
    Checking,
    Announcing,
    Waiting,
    Saving,
    Done,
    Aborted,
    Cancelled,
}

/// How a shutdown sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// World saved; the process may be stopped.
    Completed,
    /// The game was not running; nothing to do.
    Aborted,
    /// Interrupted by the operator.
    Cancelled,
}

impl ShutdownOutcome {
    pub fn is_completed(&self) -> bool {
        *self == ShutdownOutcome::Completed
    }
}

/// Countdown message for the in-game broadcast.
pub fn warning_message(minutes: u64) -> String {
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("Server is shutting down in {} {}, please logout.", minutes, unit)
}

/// Warns players, waits for them to leave, then saves the world.
pub struct ShutdownOrchestrator {
    service: Arc<dyn ServiceManager>,
    control: Arc<dyn GameControl>,
    notifier: Arc<dyn Notifier>,
    config: ShutdownConfig,
    phase: ShutdownPhase,
    warnings_sent: u32,
}

impl ShutdownOrchestrator {
    pub fn new(
        service: Arc<dyn ServiceManager>,
        control: Arc<dyn GameControl>,
        notifier: Arc<dyn Notifier>,
        config: ShutdownConfig,
    ) -> Self {
        Self {
            service,
            control,
            notifier,
            config,
            phase: ShutdownPhase::Idle,
            warnings_sent: 0,
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    /// Countdown broadcasts sent so far.
    pub fn warnings_sent(&self) -> u32 {
        self.warnings_sent
    }

    /// Whole minutes left when `remaining` warnings are still to come.
    fn minutes_left(&self, remaining: u32) -> u64 {
        (u64::from(remaining) * self.config.warning_interval_ms)
            .div_ceil(60_000)
            .max(1)
    }

    fn enter(&mut self, next: ShutdownPhase) {
        tracing::debug!(from = ?self.phase, to = ?next, "Shutdown phase");
        self.phase = next;
    }

    /// Run the sequence to completion or until `interrupt` fires.
    pub async fn run(&mut self, interrupt: &mut broadcast::Receiver<()>) -> ShutdownOutcome {
        self.enter(ShutdownPhase::Checking);
        if interrupted(interrupt) {
            return self.cancel(false).await;
        }

        let state = self.service.status().await;
        if !state.accepts_control() {
            tracing::info!(state = %state, "Game is not currently running");
            self.enter(ShutdownPhase::Aborted);
            return ShutdownOutcome::Aborted;
        }

        self.enter(ShutdownPhase::Announcing);
        notify_best_effort(self.notifier.as_ref(), &NotificationEvent::game_stopping()).await;

        self.enter(ShutdownPhase::Waiting);
        let mut remaining = self.config.warning_iterations;
        while remaining > 0 {
            if interrupted(interrupt) {
                return self.cancel(true).await;
            }

            match self.control.player_count().await {
                Err(e) => {
                    tracing::info!(error = %e, "Players not visible, skipping countdown");
                    break;
                }
                Ok(0) => {
                    tracing::info!("No players online");
                    break;
                }
                Ok(count) => {
                    let message = warning_message(self.minutes_left(remaining));
                    tracing::info!(players = count, remaining, "Warning players of shutdown");
                    if let Err(e) = self.control.announce(&message).await {
                        tracing::warn!(error = %e, "Shutdown warning not broadcast");
                    }
                    self.warnings_sent += 1;

                    if interruptible_sleep(self.config.warning_interval(), interrupt).await {
                        return self.cancel(true).await;
                    }
                    remaining -= 1;
                }
            }
        }

        self.enter(ShutdownPhase::Saving);
        if interrupted(interrupt) {
            return self.cancel(false).await;
        }
        match self.control.save().await {
            Ok(()) => tracing::info!("World save requested"),
            Err(e) => tracing::warn!(error = %e, "⛔ Unable to save world via game API"),
        }
        if interruptible_sleep(self.config.save_grace(), interrupt).await {
            return self.cancel(false).await;
        }

        self.enter(ShutdownPhase::Done);
        tracing::info!(warnings = self.warnings_sent, "Ready for shutdown");
        ShutdownOutcome::Completed
    }

    async fn cancel(&mut self, tell_players: bool) -> ShutdownOutcome {
        if tell_players {
            if let Err(e) = self.control.announce(CANCELLED_MESSAGE).await {
                tracing::warn!(error = %e, "Cancellation not broadcast");
            }
        }
        tracing::info!(phase = ?self.phase, "Cancelled shutdown");
        self.enter(ShutdownPhase::Cancelled);
        ShutdownOutcome::Cancelled
    }
}
