//! # ARM Connector – poll triggers
//!
//! Stateless handlers for the poll-trigger protocol. The polling engine owns
//! the only state: an opaque trigger-state string handed out after each poll
//! and echoed back on the next one.
//!
//! - **Events** – fires once per activity-log event newer than the watermark
//! - **Metrics** – fires when a metric aggregate starts passing a threshold

pub mod envelope;
pub mod error;
pub mod events;
pub mod metrics;

pub use envelope::TriggerResponse;
pub use error::TriggerError;
