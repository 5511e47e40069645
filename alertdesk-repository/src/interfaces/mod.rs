//! Interface definitions for the alert desk stores.
//!
//! Each store is an abstract trait so the core can be wired against any
//! backend (PostgreSQL, Neo4j, in-memory) and tested with mocks.

mod alert_store;
mod change_store;
mod graph_store;
mod rule_store;

pub use alert_store::AlertStore;
pub use change_store::ChangeStore;
pub use graph_store::GraphStore;
pub use rule_store::RuleStore;
