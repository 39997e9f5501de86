//! Outbound network helpers.
//!
//! # Design Decisions
//! - Lookups are optional extras; failures degrade to `None`, never errors

pub mod public_ip;

pub use public_ip::PublicIpResolver;
