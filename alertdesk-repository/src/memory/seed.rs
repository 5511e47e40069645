use std::path::Path;

use alertdesk_shared::{Alert, Change, CorrelationRule, TopologyEdge, TopologyNode};
use serde::Deserialize;

use super::{MemoryAlertStore, MemoryChangeStore, MemoryGraphStore, MemoryRuleStore};
use crate::errors::StoreError;

/// JSON fixture used to populate the in-memory stores at startup.
///
/// ```json
/// { "alerts": [...], "rules": [...], "changes": [...],
///   "nodes": [{"name": "db-1"}], "edges": [{"source": "app", "target": "db-1", "type": "USES"}] }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct MemorySeed {
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub rules: Vec<CorrelationRule>,
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub edges: Vec<TopologyEdge>,
}

impl MemorySeed {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::unavailable(format!("cannot read seed {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn into_stores(
        self,
    ) -> Result<
        (
            MemoryAlertStore,
            MemoryRuleStore,
            MemoryChangeStore,
            MemoryGraphStore,
        ),
        StoreError,
    > {
        Ok((
            MemoryAlertStore::with_alerts(self.alerts),
            MemoryRuleStore::new(self.rules),
            MemoryChangeStore::new(self.changes),
            MemoryGraphStore::from_parts(self.nodes, self.edges)?,
        ))
    }
}
