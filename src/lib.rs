//! # ARM Connector
//!
//! HTTP facade over Azure Resource Manager. The ARM client lives in
//! `armc-azure`, the poll-trigger logic in `armc-triggers`; this crate wires
//! them into an axum router and owns start-up concerns.
//!
//! ## Modules
//!
//! - **api** – router and handlers
//! - **config** – environment + YAML overlay configuration
//! - **envelope** – poll-trigger responses (`Location`, `Retry-After`, `x-ms-trigger-state`)
//! - **fault** – `ArmError` → HTTP status
//! - **logging** – tracing subscriber setup

pub mod api;
pub mod config;
pub mod envelope;
pub mod fault;
pub mod logging;

pub use api::ApiService;
pub use config::{ConfigError, ConnectorConfig};
