//! Neo4j topology backend.

mod graph_store;

pub use graph_store::Neo4jGraphStore;
