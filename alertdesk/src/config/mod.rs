//! Configuration and dependency initialization.

mod dependencies;
mod settings;

pub use dependencies::{ConnectionMode, Dependencies, GraphBackend, StoreBackend};
pub use settings::DeskConfig;
