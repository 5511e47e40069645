//! In-memory store backends.
//!
//! Used by the test suites and by the `memory` backend mode. Every store keeps
//! its records behind a `std::sync::RwLock`; a poisoned lock surfaces as
//! `StoreError::Unavailable` rather than a panic.

mod alert_store;
mod graph_store;
mod records;
mod seed;

pub use alert_store::MemoryAlertStore;
pub use graph_store::MemoryGraphStore;
pub use records::{MemoryChangeStore, MemoryRuleStore};
pub use seed::MemorySeed;

use crate::errors::StoreError;

pub(crate) fn poisoned<T>(_: T) -> StoreError {
    StoreError::unavailable("in-memory store lock poisoned")
}
