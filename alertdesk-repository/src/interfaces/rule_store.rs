//! Correlation rule store trait definition.

use alertdesk_shared::CorrelationRule;
use async_trait::async_trait;

use crate::errors::StoreError;

/// Read access to the configured correlation rules. Rule editing lives elsewhere.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn list_rules(&self) -> Result<Vec<CorrelationRule>, StoreError>;
}
