//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! manager.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ManagerConfig (validated, immutable)
//!
//! PalWorldSettings.ini (or the default template)
//!     → codec.rs (tokenize & type option blob)
//!     → store.rs (ordered entries, get/set, persist)
//!     → ConfigHandle shared by control client, startup check, CLI
//!
//! On file change:
//!     watcher.rs detects change
//!     → store.rs reloads
//!     → atomic swap inside ConfigHandle
//!
//! .settings.toml
//!     → settings.rs (webhook, message overrides), read per notification
//! ```
//!
//! # Design Decisions
//! - Manager config is immutable once loaded
//! - All manager config fields have defaults to allow minimal configs
//! - Game settings are read fresh per operation from the latest snapshot
//! - Only a failed initial load of the game settings is fatal

pub mod codec;
pub mod loader;
pub mod schema;
pub mod settings;
pub mod store;
pub mod validation;
pub mod watcher;

pub use codec::{ConfigEntry, ConfigValue, ValueKind};
pub use loader::ConfigError;
pub use schema::ManagerConfig;
pub use schema::{ControlConfig, ShutdownConfig, WatchConfig};
pub use settings::OperatorSettings;
pub use store::{ConfigHandle, ConfigStore, StorePaths};
