//! Notification events and error definitions.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Kinds of lifecycle and player events relayed to the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GameStarted,
    GameStopping,
    PlayerJoined,
    PlayerLeft,
    PlayerLeveledUp,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::GameStarted,
        EventKind::GameStopping,
        EventKind::PlayerJoined,
        EventKind::PlayerLeft,
        EventKind::PlayerLeveledUp,
    ];

    /// Key used in the operator settings.
    pub fn key(&self) -> &'static str {
        match self {
            EventKind::GameStarted => "game_started",
            EventKind::GameStopping => "game_stopping",
            EventKind::PlayerJoined => "player_joined",
            EventKind::PlayerLeft => "player_left",
            EventKind::PlayerLeveledUp => "player_leveled_up",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::GameStarted => "Game Started",
            EventKind::GameStopping => "Game Stopping",
            EventKind::PlayerJoined => "Player Joined",
            EventKind::PlayerLeft => "Player Left",
            EventKind::PlayerLeveledUp => "Player Leveled Up",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            EventKind::GameStarted => ":green_square: Palworld has started",
            EventKind::GameStopping => ":small_red_triangle_down: Shutting down Palworld",
            EventKind::PlayerJoined => "%s has joined!",
            EventKind::PlayerLeft => "%s has left the game",
            EventKind::PlayerLeveledUp => "%s has leveled up to %s!",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.key() == s.trim())
            .ok_or_else(|| {
                let known: Vec<_> = EventKind::ALL.iter().map(EventKind::key).collect();
                format!("unknown event '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

/// An event with its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub params: Vec<String>,
}

impl NotificationEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            params: Vec::new(),
        }
    }

    pub fn with_params<I, S>(kind: EventKind, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn game_started(params: Vec<String>) -> Self {
        Self::with_params(EventKind::GameStarted, params)
    }

    pub fn game_stopping() -> Self {
        Self::new(EventKind::GameStopping)
    }

    pub fn player_joined(name: &str) -> Self {
        Self::with_params(EventKind::PlayerJoined, [name])
    }

    pub fn player_left(name: &str) -> Self {
        Self::with_params(EventKind::PlayerLeft, [name])
    }

    pub fn player_leveled_up(name: &str, level: i64) -> Self {
        Self::with_params(EventKind::PlayerLeveledUp, [name.to_string(), level.to_string()])
    }
}

/// How a message left the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Posted to the webhook.
    Sent(String),
    /// Delivery is off; the message was only logged.
    LocalOnly(String),
}

impl Delivery {
    pub fn message(&self) -> &str {
        match self {
            Delivery::Sent(m) | Delivery::LocalOnly(m) => m,
        }
    }
}

/// Metadata returned by a webhook URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WebhookInfo {
    pub name: String,
    pub channel_id: String,
    pub guild_id: String,
}

/// Errors from building or delivering a notification. Never fatal.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Could not read notification settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("Could not notify webhook: {0}")]
    Delivery(String),

    #[error("Webhook rejected message with status {0}")]
    Rejected(u16),

    #[error("No webhook configured")]
    NoWebhook,
}

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;
