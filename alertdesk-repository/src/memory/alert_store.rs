use std::sync::RwLock;

use alertdesk_shared::{Alert, AlertId};
use async_trait::async_trait;

use super::poisoned;
use crate::errors::StoreError;
use crate::interfaces::AlertStore;
use crate::types::{AlertFilter, AlertMutation, FindOptions, SortOrder};

/// Alert documents kept in insertion order.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(alerts: impl IntoIterator<Item = Alert>) -> Self {
        Self {
            alerts: RwLock::new(alerts.into_iter().collect()),
        }
    }

    /// Copy of every stored alert, in insertion order.
    pub fn snapshot(&self) -> Result<Vec<Alert>, StoreError> {
        Ok(self.alerts.read().map_err(poisoned)?.clone())
    }

    fn apply(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
        first_only: bool,
    ) -> Result<u64, StoreError> {
        let mut alerts = self.alerts.write().map_err(poisoned)?;
        let mut modified = 0;
        for alert in alerts.iter_mut().filter(|a| filter.matches(a)) {
            for mutation in mutations {
                mutation.apply(alert);
            }
            modified += 1;
            if first_only {
                break;
            }
        }
        Ok(modified)
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn find_many(
        &self,
        filter: &AlertFilter,
        options: FindOptions,
    ) -> Result<Vec<Alert>, StoreError> {
        let alerts = self.alerts.read().map_err(poisoned)?;
        let mut found: Vec<Alert> = alerts.iter().filter(|a| filter.matches(a)).cloned().collect();
        drop(alerts);

        match options.sort {
            Some(SortOrder::Ascending) => found.sort_by_key(|a| a.first_seen),
            Some(SortOrder::Descending) => found.sort_by(|a, b| b.first_seen.cmp(&a.first_seen)),
            None => {}
        }

        Ok(found
            .into_iter()
            .skip(options.skip.unwrap_or(0))
            .take(options.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn find_one(&self, filter: &AlertFilter) -> Result<Option<Alert>, StoreError> {
        let alerts = self.alerts.read().map_err(poisoned)?;
        Ok(alerts.iter().find(|a| filter.matches(a)).cloned())
    }

    async fn insert(&self, alert: &Alert) -> Result<AlertId, StoreError> {
        let mut alerts = self.alerts.write().map_err(poisoned)?;
        if alerts.iter().any(|a| a.id == alert.id) {
            return Err(StoreError::validation(format!(
                "alert {} already exists",
                alert.id
            )));
        }
        alerts.push(alert.clone());
        Ok(alert.id)
    }

    async fn update_one(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
    ) -> Result<u64, StoreError> {
        self.apply(filter, mutations, true)
    }

    async fn update_many(
        &self,
        filter: &AlertFilter,
        mutations: &[AlertMutation],
    ) -> Result<u64, StoreError> {
        self.apply(filter, mutations, false)
    }
}
