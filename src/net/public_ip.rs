//! Public address lookup for connection details.

use std::net::IpAddr;
use std::time::Duration;

/// Asks an external echo service for this host's public address.
#[derive(Debug, Clone)]
pub struct PublicIpResolver {
    http: reqwest::Client,
    url: Option<String>,
}

impl PublicIpResolver {
    /// Resolver for `url`. An empty URL disables the lookup.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let url = Some(url.trim().to_string()).filter(|u| !u.is_empty());
        Ok(Self { http, url })
    }

    /// Resolver that never looks anything up.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            url: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Public address, or `None` when the lookup is off or fails.
    pub async fn resolve(&self) -> Option<IpAddr> {
        let url = self.url.as_deref()?;

        let body = match self.http.get(url).send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok()?,
            Ok(response) => {
                tracing::debug!(status = %response.status(), "Public address lookup rejected");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Public address lookup failed");
                return None;
            }
        };

        let address = parse_address(&body);
        if address.is_none() {
            tracing::debug!(body = %body.trim(), "Public address lookup returned garbage");
        }
        address
    }
}

/// Parse a plain-text address body.
pub fn parse_address(body: &str) -> Option<IpAddr> {
    body.trim().parse().ok()
}
