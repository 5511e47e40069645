//! # Alert Desk Repository
//!
//! This crate provides the store traits the alert desk core depends on, the
//! typed filter and mutation model they speak, and concrete backends:
//! in-memory (tests, local runs), PostgreSQL JSONB documents, and Neo4j for
//! the topology graph.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod neo4j;
pub mod postgres;
pub mod types;

pub use errors::StoreError;
pub use interfaces::{AlertStore, ChangeStore, GraphStore, RuleStore};
pub use memory::{
    MemoryAlertStore, MemoryChangeStore, MemoryGraphStore, MemoryRuleStore, MemorySeed,
};
pub use neo4j::Neo4jGraphStore;
pub use postgres::{PostgresAlertStore, PostgresChangeStore, PostgresRuleStore};
pub use types::{AlertFilter, AlertMutation, ChangeWindow, FindOptions, SortOrder};
