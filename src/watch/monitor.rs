//! Background watch loop.
//!
//! # Responsibilities
//! - Poll the service state every tick
//! - Confirm and announce fresh starts
//! - Turn player roster changes into notifications

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::config::WatchConfig;
use crate::control::GameControl;
use crate::lifecycle::startup::{StartupCheck, StartupOutcome};
use crate::notifications::{notify_best_effort, Notifier};
use crate::observability::metrics;
use crate::service::{ServerState, ServiceManager};
use crate::watch::diff::{PlayerEvent, WatchState};

/// What one tick observed and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub state: ServerState,
    pub startup: Option<StartupOutcome>,
    pub events: Vec<PlayerEvent>,
}

pub struct WatchLoop {
    service: Arc<dyn ServiceManager>,
    control: Arc<dyn GameControl>,
    notifier: Arc<dyn Notifier>,
    startup: StartupCheck,
    config: WatchConfig,
    state: WatchState,
    reloads: Option<mpsc::UnboundedReceiver<()>>,
}

impl WatchLoop {
    pub fn new(
        service: Arc<dyn ServiceManager>,
        control: Arc<dyn GameControl>,
        notifier: Arc<dyn Notifier>,
        startup: StartupCheck,
        config: WatchConfig,
    ) -> Self {
        Self {
            service,
            control,
            notifier,
            startup,
            config,
            state: WatchState::new(),
            reloads: None,
        }
    }

    /// Log game settings reloads signalled by the config watcher.
    pub fn with_reloads(mut self, reloads: mpsc::UnboundedReceiver<()>) -> Self {
        self.reloads = Some(reloads);
        self
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Tick until interrupted.
    pub async fn run(mut self, mut interrupt: broadcast::Receiver<()>) {
        tracing::info!(tick_ms = self.config.tick_ms, "Watch loop starting");

        let mut ticker = time::interval(self.config.tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick(&mut interrupt).await;
                    if report.startup == Some(StartupOutcome::Cancelled) {
                        tracing::info!("Watch loop interrupted during startup check, exiting");
                        break;
                    }
                }
                _ = interrupt.recv() => {
                    tracing::info!("Watch loop received interrupt, exiting");
                    break;
                }
            }
        }
    }

    /// Run one observation step.
    pub async fn tick(&mut self, interrupt: &mut broadcast::Receiver<()>) -> TickReport {
        self.drain_reloads();

        let state = self.service.status().await;
        let mut report = TickReport {
            state,
            startup: None,
            events: Vec::new(),
        };

        if !state.is_running() {
            if self.state.running {
                tracing::info!(state = %state, "Game stopped, clearing player tracking");
            }
            self.state.reset();
            metrics::record_watch_tick(false);
            return report;
        }

        if !self.state.running {
            tracing::info!("Game started, confirming");
            let outcome = self.startup.run(interrupt).await;
            report.startup = Some(outcome);
            match outcome {
                StartupOutcome::Cancelled => return report,
                StartupOutcome::NotRunning => {
                    self.state.reset();
                    metrics::record_watch_tick(false);
                    return report;
                }
                _ => self.state.running = true,
            }
        }

        match self.control.players().await {
            Ok(players) => {
                metrics::record_players_online(players.len());
                let events = self.state.reconcile(&players);
                for event in &events {
                    notify_best_effort(self.notifier.as_ref(), &event.to_notification()).await;
                }
                report.events = events;
            }
            Err(e) => tracing::debug!(error = %e, "Player list unavailable, keeping roster"),
        }

        metrics::record_watch_tick(true);
        report
    }

    fn drain_reloads(&mut self) {
        let Some(reloads) = self.reloads.as_mut() else {
            return;
        };
        let mut count = 0;
        while reloads.try_recv().is_ok() {
            count += 1;
        }
        if count > 0 {
            tracing::info!(reloads = count, "Game settings reloaded");
        }
    }
}
