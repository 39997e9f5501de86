//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → journald / terminal (stderr)
//!     → Metrics endpoint (Prometheus scrape, watch mode only)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event for journald filtering
//! - Metrics are cheap and safe to record without an exporter

pub mod logging;
pub mod metrics;
