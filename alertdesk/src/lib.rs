//! # Alert Desk
//!
//! Core of the IT-operations alert desk: correlates incoming alerts into group
//! incidents, cascades closure through those incidents, extracts the incident
//! topology around an entity and assembles RCA context for an alert.
//!
//! ## Modules
//!
//! - [`grouping`]: similarity correlation and parent synthesis
//! - [`closure`]: operator clear and the closure cascade
//! - [`operator`]: acknowledge, comment and alert views
//! - [`subgraph`]: shortest-path-union incident topology
//! - [`rca`]: RCA graph payload with change overlays
//! - [`related_changes`]: direct and neighbor changes for an alert
//! - [`desk`]: the service facade over a set of injected stores
//! - [`server`]: HTTP routes
//! - [`config`]: tunables and dependency initialization
//! - [`errors`]: error types for the core

pub mod closure;
pub mod config;
mod context;
pub mod desk;
pub mod errors;
pub mod grouping;
pub mod locks;
pub mod operator;
pub mod rca;
pub mod related_changes;
pub mod server;
pub mod similarity;
pub mod subgraph;
pub mod timeouts;

pub use config::{DeskConfig, Dependencies};
pub use desk::{Desk, Stores};
pub use errors::DeskError;

use thiserror::Error;

/// Errors that can occur during service initialization or while serving.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

impl ServiceError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::ServerError(msg.into())
    }
}
