//! Change record store trait definition.

use alertdesk_shared::{Change, ChangeStatus};
use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::ChangeWindow;

/// Read access to change records.
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// Changes whose affected entities intersect `entities`, whose status is one of
    /// `statuses`, and whose time span overlaps `window`.
    ///
    /// Results are sorted by start time, newest first, and capped at `limit`.
    async fn find_changes_affecting(
        &self,
        entities: &[String],
        statuses: &[ChangeStatus],
        window: ChangeWindow,
        limit: usize,
    ) -> Result<Vec<Change>, StoreError>;
}
