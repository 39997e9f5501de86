//! Operator settings persisted next to the binary.
//!
//! Holds the webhook URL, its enabled flag and per-event message overrides.
//! Kept apart from the game settings so the game never sees these keys.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperatorSettings {
    pub notifications: WebhookSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub enabled: bool,
    pub webhook: String,
    /// Event key → message template.
    pub messages: BTreeMap<String, String>,
}

impl OperatorSettings {
    /// Read the settings file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Ok(toml::from_str(&content)?)
    }

    /// Write the settings file, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(0o600);
            // The mode above only applies to new files.
            if path.exists() {
                fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                    .map_err(|e| ConfigError::io(path, e))?;
            }
        }

        let mut file = options.open(path).map_err(|e| ConfigError::io(path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ConfigError::io(path, e))
    }

    /// Whether messages should be posted rather than only logged.
    pub fn delivers(&self) -> bool {
        self.notifications.enabled && !self.notifications.webhook.trim().is_empty()
    }

    /// Configured template for an event, ignoring blank overrides.
    pub fn message_override(&self, event: &str) -> Option<&str> {
        self.notifications
            .messages
            .get(event)
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
    }

    /// Store a new webhook URL and turn delivery on.
    pub fn set_webhook(&mut self, url: &str) {
        self.notifications.webhook = url.trim().to_string();
        self.notifications.enabled = true;
    }

    /// Set or clear (with an empty template) a message override.
    pub fn set_message(&mut self, event: &str, template: &str) {
        if template.trim().is_empty() {
            self.notifications.messages.remove(event);
        } else {
            self.notifications
                .messages
                .insert(event.to_string(), template.to_string());
        }
    }
}
