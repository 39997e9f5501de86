//! Game settings store.
//!
//! # Responsibilities
//! - Load the active option file, or the bundled template when absent
//! - Typed access to option values
//! - Synchronous persistence on every `set`
//!
//! # Design Decisions
//! - Entries keep file order so a save rewrites the same layout
//! - A failed write leaves the in-memory entries untouched
//! - `ConfigHandle` shares one store between components as swappable
//!   snapshots; readers never hold a lock across network calls

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use rand::Rng;

use crate::config::codec::{self, ConfigEntry, ConfigValue, ValueKind};
use crate::config::loader::ConfigError;
use crate::config::schema::PathsConfig;

/// Option keys the manager reads or writes.
pub mod keys {
    pub const REST_API_ENABLED: &str = "RESTAPIEnabled";
    pub const REST_API_PORT: &str = "RESTAPIPort";
    pub const ADMIN_PASSWORD: &str = "AdminPassword";
    pub const RCON_ENABLED: &str = "RCONEnabled";
    pub const RCON_PORT: &str = "RCONPort";
    pub const PUBLIC_PORT: &str = "PublicPort";
    pub const SERVER_PASSWORD: &str = "ServerPassword";
    pub const SERVER_NAME: &str = "ServerName";
    pub const SERVER_DESCRIPTION: &str = "ServerDescription";
    pub const CROSSPLAY_PLATFORMS: &str = "CrossplayPlatforms";
}

/// Platforms accepted in the crossplay group.
pub const CROSSPLAY_PLATFORMS: [&str; 4] = ["Steam", "Xbox", "PS5", "Mac"];

/// Characters that cannot be confused with each other when read aloud.
const PASSWORD_ALPHABET: &[u8] = b"abcdefghjkpqrstwxyzACDEFGHJKPRTWXYZ234679";
const PASSWORD_LENGTH: usize = 16;

/// Random admin password for first-run setup.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

/// Where the store reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub active: PathBuf,
    pub template: PathBuf,
    pub header: String,
    pub option_key: String,
}

impl StorePaths {
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            active: paths.game_settings_path(),
            template: paths.default_settings_path(),
            header: paths.section_header.clone(),
            option_key: paths.option_key.clone(),
        }
    }
}

/// Ordered game settings plus the files they came from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    entries: Vec<ConfigEntry>,
    configured: bool,
    paths: StorePaths,
}

impl ConfigStore {
    /// Load the active settings, falling back to the default template.
    pub fn load(paths: StorePaths) -> Result<Self, ConfigError> {
        if let Some(entries) = read_option_file(&paths.active, &paths.option_key)? {
            tracing::debug!(path = %paths.active.display(), entries = entries.len(), "Loaded game settings");
            return Ok(Self {
                entries,
                configured: true,
                paths,
            });
        }

        if !paths.template.exists() {
            return Err(ConfigError::MissingTemplate(paths.template.clone()));
        }
        let entries = read_option_file(&paths.template, &paths.option_key)?.ok_or_else(|| {
            ConfigError::Malformed {
                path: paths.template.clone(),
                reason: format!("no {} line", paths.option_key),
            }
        })?;
        tracing::debug!(path = %paths.template.display(), entries = entries.len(), "Loaded default game settings");

        Ok(Self {
            entries,
            configured: false,
            paths,
        })
    }

    /// True once settings were read from (or written to) the active file.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ConfigValue::as_int)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_group(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(ConfigValue::as_group)
    }

    /// Set a value from user input, validating the kind name first.
    ///
    /// Nothing is changed or written when the kind or value is rejected.
    pub fn set(&mut self, key: &str, kind: &str, raw: &str) -> Result<(), ConfigError> {
        let kind: ValueKind = kind.parse()?;
        let value = ConfigValue::from_kind(kind, raw).map_err(|reason| ConfigError::InvalidValue {
            key: key.to_string(),
            kind,
            reason,
        })?;
        self.set_value(key, value)
    }

    /// Replace or insert a typed value and persist.
    pub fn set_value(&mut self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        self.set_values(vec![(key, value)])
    }

    /// Replace or insert several values with a single write.
    ///
    /// Every value is checked before anything is written, so a rejected
    /// value leaves both the file and the store untouched.
    pub fn set_values(&mut self, values: Vec<(&str, ConfigValue)>) -> Result<(), ConfigError> {
        let mut next = self.entries.clone();
        for (key, value) in &values {
            let value = match value {
                ConfigValue::String(s) => ConfigValue::String(s.replace('"', "")),
                other => other.clone(),
            };
            value.check_writable().map_err(|reason| ConfigError::InvalidValue {
                key: key.to_string(),
                kind: value.kind(),
                reason,
            })?;
            codec::upsert(&mut next, key, value);
        }
        self.write(&next)?;

        self.entries = next;
        self.configured = true;
        for (key, _) in &values {
            tracing::info!(key = %key, "Game setting updated");
        }
        Ok(())
    }

    /// Write the current entries to the active file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.write(&self.entries)
    }

    fn write(&self, entries: &[ConfigEntry]) -> Result<(), ConfigError> {
        let path = &self.paths.active;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        let document = codec::render_document(&self.paths.header, &self.paths.option_key, entries);
        fs::write(path, document).map_err(|e| ConfigError::io(path, e))
    }

    pub fn rest_api_enabled(&self) -> bool {
        self.get_bool(keys::REST_API_ENABLED).unwrap_or(false)
    }

    pub fn rest_api_port(&self) -> Option<u16> {
        self.get_int(keys::REST_API_PORT)
            .and_then(|port| u16::try_from(port).ok())
    }

    pub fn admin_password(&self) -> &str {
        self.get_str(keys::ADMIN_PASSWORD).unwrap_or_default()
    }

    pub fn rcon_enabled(&self) -> bool {
        self.get_bool(keys::RCON_ENABLED).unwrap_or(false)
    }

    pub fn crossplay_platforms(&self) -> Vec<String> {
        self.get_group(keys::CROSSPLAY_PLATFORMS)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    /// Add or remove a crossplay platform. Returns whether it is now enabled.
    pub fn toggle_crossplay(&mut self, platform: &str) -> Result<bool, ConfigError> {
        let canonical = CROSSPLAY_PLATFORMS
            .iter()
            .find(|p| p.eq_ignore_ascii_case(platform.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                key: keys::CROSSPLAY_PLATFORMS.to_string(),
                kind: ValueKind::Group,
                reason: format!(
                    "unknown platform '{}', expected one of: {}",
                    platform,
                    CROSSPLAY_PLATFORMS.join(", ")
                ),
            })?;

        let mut platforms = self.crossplay_platforms();
        let enabled = match platforms.iter().position(|p| p == canonical) {
            Some(index) => {
                platforms.remove(index);
                false
            }
            None => {
                platforms.push(canonical.to_string());
                true
            }
        };
        self.set_value(keys::CROSSPLAY_PLATFORMS, ConfigValue::Group(platforms))?;
        Ok(enabled)
    }

    /// Turn on the REST API with a fresh admin password. Returns the password.
    pub fn enable_api(&mut self) -> Result<String, ConfigError> {
        let password = generate_password();
        self.set_values(vec![
            (keys::REST_API_ENABLED, ConfigValue::Bool(true)),
            (keys::ADMIN_PASSWORD, ConfigValue::String(password.clone())),
        ])?;
        Ok(password)
    }
}

fn read_option_file(path: &Path, option_key: &str) -> Result<Option<Vec<ConfigEntry>>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let document = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

    match codec::find_option_blob(&document, option_key) {
        None => Ok(None),
        Some(Ok(blob)) => Ok(Some(codec::parse(blob))),
        Some(Err(reason)) => Err(ConfigError::Malformed {
            path: path.to_path_buf(),
            reason,
        }),
    }
}

/// Shared handle to the game settings.
///
/// Cloning is cheap; all clones observe the same store.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<ConfigStore>>,
}

impl ConfigHandle {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(store)),
        }
    }

    pub fn load(paths: StorePaths) -> Result<Self, ConfigError> {
        ConfigStore::load(paths).map(Self::new)
    }

    /// Current settings. Cheap; take a fresh one per operation.
    pub fn snapshot(&self) -> Arc<ConfigStore> {
        self.inner.load_full()
    }

    /// Apply a change to a copy of the store and publish it on success.
    pub fn update<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut ConfigStore) -> Result<(), ConfigError>,
    {
        let mut next = ConfigStore::clone(&self.inner.load_full());
        change(&mut next)?;
        self.inner.store(Arc::new(next));
        Ok(())
    }

    pub fn set(&self, key: &str, kind: &str, raw: &str) -> Result<(), ConfigError> {
        self.update(|store| store.set(key, kind, raw))
    }

    pub fn set_value(&self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        self.update(|store| store.set_value(key, value))
    }

    /// Re-read the files from disk.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let paths = self.snapshot().paths().clone();
        let store = ConfigStore::load(paths)?;
        self.inner.store(Arc::new(store));
        Ok(())
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.snapshot();
        f.debug_struct("ConfigHandle")
            .field("active", &store.paths().active)
            .field("configured", &store.is_configured())
            .field("entries", &store.entries().len())
            .finish()
    }
}
