use std::sync::RwLock;

use alertdesk_shared::{Change, ChangeStatus, CorrelationRule};
use async_trait::async_trait;

use super::poisoned;
use crate::errors::StoreError;
use crate::interfaces::{ChangeStore, RuleStore};
use crate::types::ChangeWindow;

#[derive(Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<CorrelationRule>>,
}

impl MemoryRuleStore {
    pub fn new(rules: impl IntoIterator<Item = CorrelationRule>) -> Self {
        Self {
            rules: RwLock::new(rules.into_iter().collect()),
        }
    }

    pub fn add(&self, rule: CorrelationRule) -> Result<(), StoreError> {
        self.rules.write().map_err(poisoned)?.push(rule);
        Ok(())
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn list_rules(&self) -> Result<Vec<CorrelationRule>, StoreError> {
        Ok(self.rules.read().map_err(poisoned)?.clone())
    }
}

#[derive(Default)]
pub struct MemoryChangeStore {
    changes: RwLock<Vec<Change>>,
}

impl MemoryChangeStore {
    pub fn new(changes: impl IntoIterator<Item = Change>) -> Self {
        Self {
            changes: RwLock::new(changes.into_iter().collect()),
        }
    }

    pub fn add(&self, change: Change) -> Result<(), StoreError> {
        self.changes.write().map_err(poisoned)?.push(change);
        Ok(())
    }
}

#[async_trait]
impl ChangeStore for MemoryChangeStore {
    async fn find_changes_affecting(
        &self,
        entities: &[String],
        statuses: &[ChangeStatus],
        window: ChangeWindow,
        limit: usize,
    ) -> Result<Vec<Change>, StoreError> {
        let changes = self.changes.read().map_err(poisoned)?;
        let mut found: Vec<Change> = changes
            .iter()
            .filter(|c| statuses.contains(&c.status))
            .filter(|c| c.overlaps_window(window.start, window.end))
            .filter(|c| entities.iter().any(|e| c.affects(e)))
            .cloned()
            .collect();
        drop(changes);

        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        found.truncate(limit);
        Ok(found)
    }
}
