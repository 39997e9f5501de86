//! Control API payloads and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Routes served by the game's REST API.
pub mod routes {
    pub const INFO: &str = "/v1/api/info";
    pub const PLAYERS: &str = "/v1/api/players";
    pub const ANNOUNCE: &str = "/v1/api/announce";
    pub const SAVE: &str = "/v1/api/save";
}

/// Response of the info route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerInfo {
    pub version: String,
    pub servername: String,
    pub description: String,
    pub worldguid: String,
}

/// One connected player as seen in a single poll.
///
/// Players carry no identity beyond their name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PlayerSnapshot {
    pub name: String,
    #[serde(default)]
    pub level: i64,
    #[serde(default, rename = "accountName", skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping: Option<f64>,
}

impl PlayerSnapshot {
    pub fn new(name: impl Into<String>, level: i64) -> Self {
        Self {
            name: name.into(),
            level,
            ..Self::default()
        }
    }
}

/// Response of the players route.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlayerList {
    #[serde(default)]
    pub players: Vec<PlayerSnapshot>,
}

/// Body of the announce route.
#[derive(Debug, Clone, Serialize)]
pub struct Announcement<'a> {
    pub message: &'a str,
}

/// Errors from the control API. Always recoverable for callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The server is neither running nor stopping.
    #[error("Not running")]
    NotRunning,

    /// The REST API is switched off in the game settings.
    #[error("API not enabled")]
    Disabled,

    /// Any network, HTTP status or payload failure.
    #[error("Failed to connect to API: {0}")]
    Unavailable(String),
}

/// Result type for control API operations.
pub type ControlResult<T> = Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_list_decoding() {
        let body = r#"{"players":[
            {"name":"Alice","accountName":"alice01","playerId":"ABC","userId":"steam_1","ip":"10.0.0.2","ping":31.5,"level":12},
            {"name":"Bob"}
        ]}"#;
        let list: PlayerList = serde_json::from_str(body).unwrap();
        assert_eq!(list.players.len(), 2);
        assert_eq!(list.players[0].level, 12);
        assert_eq!(list.players[0].player_id.as_deref(), Some("ABC"));
        assert_eq!(list.players[1], PlayerSnapshot::new("Bob", 0));
    }

    #[test]
    fn test_info_decoding_tolerates_missing_fields() {
        let info: ServerInfo = serde_json::from_str(r#"{"version":"v0.3.1"}"#).unwrap();
        assert_eq!(info.version, "v0.3.1");
        assert!(info.servername.is_empty());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ControlError::Disabled.to_string(), "API not enabled");
        assert_eq!(
            ControlError::Unavailable("connection refused".into()).to_string(),
            "Failed to connect to API: connection refused"
        );
    }
}
