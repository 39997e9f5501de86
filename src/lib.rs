//! Palworld dedicated server manager library

pub mod config;
pub mod control;
pub mod lifecycle;
pub mod net;
pub mod notifications;
pub mod observability;
pub mod service;
pub mod watch;

pub use config::schema::ManagerConfig;
pub use config::ConfigHandle;
pub use control::{GameControl, RemoteControlClient};
pub use lifecycle::{Interrupt, ShutdownOrchestrator};
pub use notifications::{NotificationDispatcher, Notifier};
pub use service::{ServiceManager, Systemd};
pub use watch::WatchLoop;
