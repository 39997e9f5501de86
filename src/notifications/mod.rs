//! Notification subsystem.
//!
//! # Data Flow
//! ```text
//! NotificationEvent (kind + params)
//!     → dispatcher.rs: load operator settings
//!     → template.rs: override or default template, pad placeholders, fill
//!     → webhook POST {"content": message}   (enabled + URL set)
//!     → local log line                       (otherwise)
//! ```
//!
//! # Design Decisions
//! - Best-effort: one POST, no retry, failures are logged and never escalated
//! - A message is never dropped silently; disabled delivery still logs it

pub mod dispatcher;
pub mod template;
pub mod types;

use async_trait::async_trait;

pub use dispatcher::NotificationDispatcher;
pub use types::{Delivery, EventKind, NotificationError, NotificationEvent, NotificationResult};

/// Delivers notification events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, event: &NotificationEvent) -> NotificationResult<Delivery>;
}

/// Dispatch an event, logging and swallowing any failure.
pub async fn notify_best_effort(notifier: &dyn Notifier, event: &NotificationEvent) {
    if let Err(e) = notifier.dispatch(event).await {
        tracing::warn!(event = %event.kind, error = %e, "Notification not delivered");
    }
}
