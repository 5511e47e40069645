//! Response payloads produced by the core services.
//!
//! - [`SubgraphView`]: the pruned incident topology around a root entity.
//! - [`RcaGraphPayload`]: the full neighborhood with change overlays, handed to an
//!   external reasoning consumer.
//! - [`RelatedChangesView`]: direct and neighbor changes overlapping an alert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::alert::{Alert, AlertStatus, Severity};
use super::change::{Change, ChangeScope, ChangeStatus, OverlapType};
use super::topology::TopologyEdge;

/// Compact alert rendering attached to subgraph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDetail {
    pub id: Uuid,
    pub alert_id: String,
    pub summary: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub notes: String,
    pub status: AlertStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub priority: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<&Alert> for AlertDetail {
    fn from(alert: &Alert) -> Self {
        Self {
            id: alert.id,
            alert_id: alert.display_id(),
            summary: alert.summary.clone(),
            notes: alert.notes.clone(),
            status: alert.status,
            severity: alert.severity,
            priority: alert.priority.clone(),
            first_seen: alert.first_seen,
            last_seen: alert.last_seen,
        }
    }
}

/// Compact change rendering attached to subgraph nodes when changes are overlaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetail {
    pub change_id: String,
    pub name: String,
    pub change_type: String,
    pub status: ChangeStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl From<&Change> for ChangeDetail {
    fn from(change: &Change) -> Self {
        Self {
            change_id: change.change_id.clone(),
            name: change.name.clone(),
            change_type: change.change_type.clone(),
            status: change.status.clone(),
            start_time: change.start_time,
            end_time: change.end_time,
        }
    }
}

/// One node of the rendered incident topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphNode {
    pub name: String,
    pub has_alert: bool,
    /// Highest severity among the node's alerts.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub support_owner: Option<String>,
    #[serde(default)]
    pub alerts: Vec<AlertDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub changes: Vec<ChangeDetail>,
}

/// The minimal topology connecting a root to every alerting node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphView {
    pub root: String,
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<TopologyEdge>,
}

impl SubgraphView {
    pub fn node(&self, name: &str) -> Option<&SubgraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node(name).is_some()
    }
}

/// Header of an RCA payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaContext {
    pub alert_id: String,
    pub root_entity_id: String,
    /// Conversation key for the downstream consumer; the incident display id.
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
}

/// A node of the RCA graph. Ids are prefixed by kind: `alert:`, `entity:`, `change:`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub attributes: Map<String, Value>,
}

/// A typed edge of the RCA graph (`AFFECTS_ENTITY`, `AFFECTS`, `TEMPORAL_OVERLAP`,
/// or a topology relationship type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attributes: Option<Map<String, Value>>,
}

/// Graph payload handed to the external RCA reasoning consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaGraphPayload {
    pub rca_context: RcaContext,
    pub nodes: Vec<RcaNode>,
    pub edges: Vec<RcaEdge>,
}

impl RcaGraphPayload {
    pub fn node(&self, id: &str) -> Option<&RcaNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_of_type<'a>(&'a self, edge_type: &'a str) -> impl Iterator<Item = &'a RcaEdge> {
        self.edges.iter().filter(move |e| e.edge_type == edge_type)
    }
}

/// A change overlapping an alert, with how and where it touches the alert's topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedChange {
    pub change_id: String,
    pub name: String,
    pub change_type: String,
    pub status: ChangeStatus,
    pub implemented_by: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub overlap_type: OverlapType,
    pub change_scope: ChangeScope,
    pub affected_entity_id: String,
    pub hop_distance: u32,
}

impl RelatedChange {
    pub fn from_change(
        change: &Change,
        entity: impl Into<String>,
        hop_distance: u32,
        scope: ChangeScope,
        alert_start: DateTime<Utc>,
    ) -> Self {
        Self {
            change_id: change.change_id.clone(),
            name: change.name.clone(),
            change_type: change.change_type.clone(),
            status: change.status.clone(),
            implemented_by: change.implemented_by.clone(),
            start_time: change.start_time,
            end_time: change.end_time,
            overlap_type: change.overlap_with(alert_start),
            change_scope: scope,
            affected_entity_id: entity.into(),
            hop_distance,
        }
    }
}

/// Changes related to an alert, split by scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedChangesView {
    pub alert_id: String,
    pub root_entity_id: String,
    pub direct_changes: Vec<RelatedChange>,
    pub neighbor_changes: Vec<RelatedChange>,
}
