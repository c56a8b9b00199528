//! # ARM Connector – Azure Resource Manager client
//!
//! Typed access to the Azure Resource Manager (ARM) management API for the
//! connector's REST facade.
//!
//! ## Features
//!
//! - **OAuth2 Authentication** – client-credentials grant, a fresh token per call
//! - **Resource Groups** – list, get, create or update, delete
//! - **Deployments** – list, get, create (generated names, incremental mode)
//! - **Generic Resources** – list with type/tag filters, get, put, delete, invoke action
//! - **Providers** – list, newest API version for a namespace/type pair
//! - **Monitor** – activity-log events, metric definitions, metric values
//! - **Identifiers** – resource-group, deployment and resource identity parsing
//!
//! Calls are never retried; each is bounded by the client's deadline.

pub mod types;
pub mod client;
pub mod auth;
pub mod filter;
pub mod identifiers;
pub mod resource_groups;
pub mod deployments;
pub mod resources;
pub mod providers;
pub mod monitor;
pub mod service;

pub use service::ArmService;
pub use types::{ArmError, ArmResult};
