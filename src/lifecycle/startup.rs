//! Startup confirmation.
//!
//! # Responsibilities
//! - Confirm a freshly started game answers on its control API
//! - Fall back to a fixed wait when the API is disabled
//! - Announce the start with connection details
//!
//! # Design Decisions
//! - Confirmation failure is logged, the start is announced anyway
//! - Waits observe the interrupt; an interrupted check announces nothing

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::store::keys;
use crate::config::{ConfigHandle, ConfigStore, WatchConfig};
use crate::control::GameControl;
use crate::lifecycle::signals::interruptible_sleep;
use crate::net::PublicIpResolver;
use crate::notifications::{notify_best_effort, NotificationEvent, Notifier};
use crate::service::ServiceManager;

/// How a startup check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// The service is not running; nothing announced.
    NotRunning,
    /// The control API answered.
    Verified,
    /// The control API never answered within the attempt budget.
    Unverified,
    /// API disabled; waited the fallback delay instead.
    Assumed,
    /// Interrupted while waiting.
    Cancelled,
}

/// Waits for a fresh start to settle, then dispatches `game_started`.
pub struct StartupCheck {
    service: Arc<dyn ServiceManager>,
    control: Arc<dyn GameControl>,
    notifier: Arc<dyn Notifier>,
    settings: ConfigHandle,
    public_ip: PublicIpResolver,
    config: WatchConfig,
}

impl StartupCheck {
    pub fn new(
        service: Arc<dyn ServiceManager>,
        control: Arc<dyn GameControl>,
        notifier: Arc<dyn Notifier>,
        settings: ConfigHandle,
        public_ip: PublicIpResolver,
        config: WatchConfig,
    ) -> Self {
        Self {
            service,
            control,
            notifier,
            settings,
            public_ip,
            config,
        }
    }

    pub async fn run(&self, interrupt: &mut broadcast::Receiver<()>) -> StartupOutcome {
        let state = self.service.status().await;
        if !state.is_running() {
            tracing::info!(state = %state, "Game is not currently running");
            return StartupOutcome::NotRunning;
        }

        let outcome = if self.settings.snapshot().rest_api_enabled() {
            match self.poll_until_online(interrupt).await {
                Some(true) => {
                    tracing::info!("Verified game is online and API is connected");
                    StartupOutcome::Verified
                }
                Some(false) => {
                    tracing::warn!(
                        attempts = self.config.startup_attempts + 1,
                        "Unable to verify game has started"
                    );
                    StartupOutcome::Unverified
                }
                None => return self.cancelled(),
            }
        } else {
            if interruptible_sleep(self.config.startup_fallback(), interrupt).await {
                return self.cancelled();
            }
            tracing::info!("Game should have been started, enable the API to verify");
            StartupOutcome::Assumed
        };

        let params = connection_details(self.public_ip.resolve().await, &self.settings.snapshot());
        notify_best_effort(self.notifier.as_ref(), &NotificationEvent::game_started(params)).await;
        outcome
    }

    /// Poll the player count until it answers. `None` when interrupted.
    async fn poll_until_online(&self, interrupt: &mut broadcast::Receiver<()>) -> Option<bool> {
        let mut attempts_left = self.config.startup_attempts;
        loop {
            match self.control.player_count().await {
                Ok(count) => {
                    tracing::debug!(players = count, "Control API answered");
                    return Some(true);
                }
                Err(e) if attempts_left == 0 => {
                    tracing::debug!(error = %e, "Last startup poll failed");
                    return Some(false);
                }
                Err(e) => tracing::debug!(error = %e, attempts_left, "Game not answering yet"),
            }

            if interruptible_sleep(self.config.startup_interval(), interrupt).await {
                return None;
            }
            attempts_left -= 1;
        }
    }

    fn cancelled(&self) -> StartupOutcome {
        tracing::info!("Cancelled startup wait check");
        StartupOutcome::Cancelled
    }
}

/// `game_started` parameters: address with public port, then the user password.
///
/// Empty when the public address is unknown.
pub fn connection_details(address: Option<IpAddr>, settings: &ConfigStore) -> Vec<String> {
    let Some(ip) = address else {
        return Vec::new();
    };

    let port = settings
        .get_int(keys::PUBLIC_PORT)
        .and_then(|p| u16::try_from(p).ok());
    let mut params = vec![match port {
        Some(port) => SocketAddr::new(ip, port).to_string(),
        None => ip.to_string(),
    }];

    if let Some(password) = settings
        .get_str(keys::SERVER_PASSWORD)
        .filter(|p| !p.is_empty())
    {
        params.push(format!("User password: {}", password));
    }
    params
}
