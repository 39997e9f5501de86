//! Metrics collection and exposition.
//!
//! # Metrics
//! - `palserver_control_requests_total` (counter): control API calls by route, outcome
//! - `palserver_notifications_total` (counter): notifications by event, outcome
//! - `palserver_watch_ticks_total` (counter): completed watch ticks
//! - `palserver_players_online` (gauge): players in the last snapshot
//! - `palserver_server_running` (gauge): 1=running, 0=not running
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Exporter is opt-in; only the long-running watch exposes it

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_control_request(route: &str, outcome: &'static str) {
    metrics::counter!(
        "palserver_control_requests_total",
        "route" => route.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_notification(event: &'static str, outcome: &'static str) {
    metrics::counter!(
        "palserver_notifications_total",
        "event" => event,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_watch_tick(running: bool) {
    metrics::counter!("palserver_watch_ticks_total").increment(1);
    metrics::gauge!("palserver_server_running").set(if running { 1.0 } else { 0.0 });
}

pub fn record_players_online(count: usize) {
    metrics::gauge!("palserver_players_online").set(count as f64);
}
