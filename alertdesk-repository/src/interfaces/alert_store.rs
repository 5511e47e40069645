//! Alert document store trait definition.

use alertdesk_shared::{Alert, AlertId};
use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::{AlertFilter, AlertMutation, FindOptions};

/// Abstracts the document store holding alert records.
///
/// Every update is a single-document atomic step. Nothing wraps several calls in
/// a transaction; callers needing read-decide-write atomicity must serialize
/// themselves.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Fetch every alert matching `filter`, honouring sort, skip and limit.
    async fn find_many(
        &self,
        filter: &AlertFilter,
        options: FindOptions,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Fetch the first alert matching `filter`, if any.
    async fn find_one(&self, filter: &AlertFilter) -> Result<Option<Alert>, StoreError>;

    /// Insert a new alert document and return its id.
    async fn insert(&self, alert: &Alert) -> Result<AlertId, StoreError>;

    /// Apply `mutations` to the first matching alert. Returns the modified count (0 or 1).
    async fn update_one(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
    ) -> Result<u64, StoreError>;

    /// Apply `mutations` to every matching alert. Returns the modified count.
    async fn update_many(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
    ) -> Result<u64, StoreError>;
}
