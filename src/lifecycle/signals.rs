//! Interrupt coordination and OS signal handling.
//!
//! # Responsibilities
//! - Broadcast an interrupt to every long-running sequence
//! - Translate SIGINT / SIGTERM into that interrupt
//!
//! # Design Decisions
//! - Cooperative: receivers check between blocking points, in-flight
//!   requests are never aborted
//! - A second signal forces the process to exit

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;

/// Operator interrupt shared by the shutdown countdown and the watch loop.
///
/// Each sequence holds its own receiver and checks it between steps, so an
/// interrupt lands at the next warning, poll or tick.
#[derive(Clone)]
pub struct Interrupt {
    tx: broadcast::Sender<()>,
}

impl Interrupt {
    pub fn new() -> Self {
        // One slot: repeated interrupts collapse into a single pending one.
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver for a sequence that should stop when the operator interrupts.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Interrupt every subscribed sequence. Returns false when none was running.
    pub fn trigger(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Forward SIGINT / SIGTERM into this interrupt.
    pub fn listen_for_signals(&self) -> JoinHandle<()> {
        let interrupt = self.clone();
        tokio::spawn(async move {
            if !wait_for_signal().await {
                return;
            }
            if interrupt.trigger() {
                tracing::info!("Interrupt received, finishing current step");
            } else {
                tracing::info!("Interrupt received with nothing in progress");
            }

            if wait_for_signal().await {
                tracing::warn!("Second interrupt received, exiting immediately");
                std::process::exit(130);
            }
        })
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for SIGINT or SIGTERM. Returns false when handlers cannot be installed.
async fn wait_for_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                return tokio::signal::ctrl_c().await.is_ok();
            }
        };
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.is_ok(),
            _ = terminate.recv() => true,
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.is_ok()
    }
}

/// True when an interrupt arrived since the last check.
pub fn interrupted(rx: &mut broadcast::Receiver<()>) -> bool {
    matches!(rx.try_recv(), Ok(()) | Err(TryRecvError::Lagged(_)))
}

/// Sleep for `duration` unless interrupted first. Returns true when interrupted.
pub async fn interruptible_sleep(duration: Duration, rx: &mut broadcast::Receiver<()>) -> bool {
    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);

    tokio::select! {
        _ = &mut sleep => false,
        res = rx.recv() => match res {
            Ok(()) | Err(RecvError::Lagged(_)) => true,
            Err(RecvError::Closed) => {
                // Nobody can interrupt any more; finish the wait.
                sleep.await;
                false
            }
        },
    }
}
