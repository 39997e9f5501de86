//! Webhook notification dispatcher.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::ACCEPT;

use crate::config::schema::NotificationConfig;
use crate::config::settings::OperatorSettings;
use crate::notifications::template;
use crate::notifications::types::{
    Delivery, EventKind, NotificationError, NotificationEvent, NotificationResult, WebhookInfo,
};
use crate::notifications::Notifier;
use crate::observability::metrics;

/// Formats events and posts them to the operator's webhook.
///
/// Operator settings are re-read on every dispatch so edits apply immediately.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    http: reqwest::Client,
    settings_path: PathBuf,
}

impl NotificationDispatcher {
    pub fn new(config: &NotificationConfig, settings_path: PathBuf) -> NotificationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        Ok(Self { http, settings_path })
    }

    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    pub fn settings(&self) -> NotificationResult<OperatorSettings> {
        Ok(OperatorSettings::load(&self.settings_path)?)
    }

    /// Operator override when set, otherwise the built-in template.
    pub fn template_for(settings: &OperatorSettings, kind: EventKind) -> String {
        settings
            .message_override(kind.key())
            .unwrap_or_else(|| kind.default_template())
            .to_string()
    }

    /// Render the final message text for an event.
    pub fn compose(settings: &OperatorSettings, event: &NotificationEvent) -> String {
        template::render(&Self::template_for(settings, event.kind), &event.params)
    }

    /// Fetch the webhook's name and channel for display.
    pub async fn describe_webhook(&self) -> NotificationResult<WebhookInfo> {
        let settings = self.settings()?;
        let webhook = settings.notifications.webhook.trim();
        if webhook.is_empty() {
            return Err(NotificationError::NoWebhook);
        }

        let response = self
            .http
            .get(webhook)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status().as_u16()));
        }
        response
            .json::<WebhookInfo>()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }

    async fn post(&self, webhook: &str, message: &str) -> NotificationResult<()> {
        let response = self
            .http
            .post(webhook)
            .json(&serde_json::json!({ "content": message }))
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for NotificationDispatcher {
    async fn dispatch(&self, event: &NotificationEvent) -> NotificationResult<Delivery> {
        let settings = self.settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default notification settings");
            OperatorSettings::default()
        });
        let message = Self::compose(&settings, event);

        if !settings.delivers() {
            tracing::info!(event = %event.kind, message = %message, "Would be sent to webhook");
            metrics::record_notification(event.kind.key(), "local");
            return Ok(Delivery::LocalOnly(message));
        }

        tracing::info!(event = %event.kind, message = %message, "Sending to webhook");
        match self.post(&settings.notifications.webhook, &message).await {
            Ok(()) => {
                metrics::record_notification(event.kind.key(), "sent");
                Ok(Delivery::Sent(message))
            }
            Err(e) => {
                metrics::record_notification(event.kind.key(), "failed");
                Err(e)
            }
        }
    }
}
