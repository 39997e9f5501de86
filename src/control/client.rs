//! HTTP client for the game's local control API.
//!
//! # Responsibilities
//! - Check run state and API enablement before touching the network
//! - Authenticate with basic auth using the configured admin password
//! - Normalise every transport failure into `ControlError::Unavailable`

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::schema::ControlConfig;
use crate::config::store::ConfigHandle;
use crate::control::types::{
    routes, Announcement, ControlError, ControlResult, PlayerList, PlayerSnapshot, ServerInfo,
};
use crate::control::GameControl;
use crate::observability::metrics;
use crate::service::ServiceManager;

/// Client for the game's REST API. Performs no retries.
#[derive(Clone)]
pub struct RemoteControlClient {
    http: reqwest::Client,
    config: ControlConfig,
    settings: ConfigHandle,
    service: Arc<dyn ServiceManager>,
}

impl RemoteControlClient {
    /// Create a client. Port and password are read from `settings` on every call.
    pub fn new(
        config: ControlConfig,
        settings: ConfigHandle,
        service: Arc<dyn ServiceManager>,
    ) -> ControlResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ControlError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            config,
            settings,
            service,
        })
    }

    /// Issue one request. `Ok(None)` means the server answered with no content.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        body: Option<serde_json::Value>,
    ) -> ControlResult<Option<T>> {
        if !self.service.status().await.accepts_control() {
            return Err(ControlError::NotRunning);
        }

        let store = self.settings.snapshot();
        if !store.rest_api_enabled() {
            return Err(ControlError::Disabled);
        }
        let port = store
            .rest_api_port()
            .ok_or_else(|| ControlError::Unavailable("REST API port is not configured".to_string()))?;

        let url = format!("http://{}:{}{}", self.config.host, port, route);
        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.config.username, Some(store.admin_password()))
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let result = async {
            let response = request.send().await?.error_for_status()?;
            response.text().await
        }
        .await;

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                metrics::record_control_request(route, "error");
                tracing::debug!(route = %route, error = %e, "Control API request failed");
                return Err(ControlError::Unavailable(e.to_string()));
            }
        };
        metrics::record_control_request(route, "ok");

        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ControlError::Unavailable(format!("invalid response from {}: {}", route, e)))
    }
}

#[async_trait]
impl GameControl for RemoteControlClient {
    async fn info(&self) -> ControlResult<ServerInfo> {
        self.request::<ServerInfo>(Method::GET, routes::INFO, None)
            .await?
            .ok_or_else(|| ControlError::Unavailable(format!("empty response from {}", routes::INFO)))
    }

    async fn players(&self) -> ControlResult<Vec<PlayerSnapshot>> {
        self.request::<PlayerList>(Method::GET, routes::PLAYERS, None)
            .await?
            .map(|list| list.players)
            .ok_or_else(|| ControlError::Unavailable(format!("empty response from {}", routes::PLAYERS)))
    }

    async fn announce(&self, message: &str) -> ControlResult<()> {
        tracing::info!(message = %message, "Broadcasting message");
        let body = serde_json::to_value(Announcement { message })
            .map_err(|e| ControlError::Unavailable(e.to_string()))?;
        self.request::<serde_json::Value>(Method::POST, routes::ANNOUNCE, Some(body))
            .await
            .map(|_| ())
    }

    async fn save(&self) -> ControlResult<()> {
        self.request::<serde_json::Value>(Method::POST, routes::SAVE, None)
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for RemoteControlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteControlClient")
            .field("host", &self.config.host)
            .field("username", &self.config.username)
            .field("timeout_ms", &self.config.timeout_ms)
            .finish()
    }
}
