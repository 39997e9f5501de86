//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, iteration counts > 0)
//! - Validate URLs and bind addresses before any component uses them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ManagerConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ManagerConfig;

/// A single semantic problem in the manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ManagerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if config.paths.option_key.trim().is_empty() {
        errors.push(ValidationError::new("paths.option_key", "must not be empty"));
    }
    if config.control.host.trim().is_empty() {
        errors.push(ValidationError::new("control.host", "must not be empty"));
    }
    if config.control.timeout_ms == 0 {
        errors.push(ValidationError::new("control.timeout_ms", "must be greater than 0"));
    }
    if config.notifications.timeout_ms == 0 {
        errors.push(ValidationError::new("notifications.timeout_ms", "must be greater than 0"));
    }
    if config.shutdown.warning_iterations == 0 {
        errors.push(ValidationError::new("shutdown.warning_iterations", "must be greater than 0"));
    }
    if config.watch.tick_ms == 0 {
        errors.push(ValidationError::new("watch.tick_ms", "must be greater than 0"));
    }

    let public_ip_url = config.watch.public_ip_url.trim();
    if !public_ip_url.is_empty() {
        match url::Url::parse(public_ip_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "watch.public_ip_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("watch.public_ip_url", e.to_string())),
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a webhook URL entered by the operator.
pub fn validate_webhook_url(raw: &str) -> Result<url::Url, ValidationError> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| ValidationError::new("webhook", e.to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ValidationError::new(
            "webhook",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
