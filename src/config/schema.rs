//! Configuration schema definitions.
//!
//! This module defines the manager's own configuration (`manager.toml`).
//! The game server's option file is handled by `config::store`.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the server manager.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ManagerConfig {
    /// File locations for the game and operator settings.
    pub paths: PathsConfig,

    /// Host service unit.
    pub service: ServiceConfig,

    /// Game server control API.
    pub control: ControlConfig,

    /// Webhook delivery.
    pub notifications: NotificationConfig,

    /// Graceful shutdown countdown.
    pub shutdown: ShutdownConfig,

    /// Background activity watch.
    pub watch: WatchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// File locations. Relative paths resolve against `install_dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base directory; defaults to the directory holding the executable.
    pub install_dir: Option<PathBuf>,

    /// Active game settings file.
    pub game_settings: PathBuf,

    /// Template shipped with the server, used until the game settings exist.
    pub default_settings: PathBuf,

    /// Operator settings (webhook, message overrides).
    pub operator_settings: PathBuf,

    /// Section header written above the option line.
    pub section_header: String,

    /// Key of the single option line.
    pub option_key: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            install_dir: None,
            game_settings: PathBuf::from("AppFiles/Pal/Saved/Config/LinuxServer/PalWorldSettings.ini"),
            default_settings: PathBuf::from("AppFiles/DefaultPalWorldSettings.ini"),
            operator_settings: PathBuf::from(".settings.toml"),
            section_header: "/Script/Pal.PalGameWorldSettings".to_string(),
            option_key: "OptionSettings".to_string(),
        }
    }
}

impl PathsConfig {
    fn base_dir(&self) -> PathBuf {
        self.install_dir.clone().unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    fn resolve(&self, path: &PathBuf) -> PathBuf {
        if path.is_absolute() {
            path.clone()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn game_settings_path(&self) -> PathBuf {
        self.resolve(&self.game_settings)
    }

    pub fn default_settings_path(&self) -> PathBuf {
        self.resolve(&self.default_settings)
    }

    pub fn operator_settings_path(&self) -> PathBuf {
        self.resolve(&self.operator_settings)
    }
}

/// Host service unit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// systemd unit name.
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "palworld".to_string(),
        }
    }
}

/// Control API connection. Port and password come from the game settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Host the control API listens on.
    pub host: String,

    /// Basic auth username.
    pub username: String,

    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            username: "admin".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ControlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,

    /// User agent sent with webhook requests.
    pub user_agent: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: format!("palserver-manager/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Graceful shutdown countdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Number of warnings before saving anyway.
    pub warning_iterations: u32,

    /// Delay between warnings in milliseconds.
    pub warning_interval_ms: u64,

    /// Delay after the save request to let the world flush.
    pub save_grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            warning_iterations: 5,
            warning_interval_ms: 60_000,
            save_grace_ms: 5_000,
        }
    }
}

impl ShutdownConfig {
    pub fn warning_interval(&self) -> Duration {
        Duration::from_millis(self.warning_interval_ms)
    }

    pub fn save_grace(&self) -> Duration {
        Duration::from_millis(self.save_grace_ms)
    }
}

/// Background watch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Tick interval in milliseconds.
    pub tick_ms: u64,

    /// Extra player-count polls while confirming a fresh start.
    pub startup_attempts: u32,

    /// Delay between startup polls in milliseconds.
    pub startup_interval_ms: u64,

    /// Wait used instead of polling when the control API is disabled.
    pub startup_fallback_ms: u64,

    /// Public address lookup endpoint. Empty disables the lookup.
    pub public_ip_url: String,

    /// Reload the game settings when the file changes.
    pub hot_reload: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: 30_000,
            startup_attempts: 20,
            startup_interval_ms: 2_000,
            startup_fallback_ms: 30_000,
            public_ip_url: "https://api.ipify.org".to_string(),
            hot_reload: true,
        }
    }
}

impl WatchConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn startup_interval(&self) -> Duration {
        Duration::from_millis(self.startup_interval_ms)
    }

    pub fn startup_fallback(&self) -> Duration {
        Duration::from_millis(self.startup_fallback_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
