//! RCA graph payload for an alert: the alert, its whole topology neighborhood and
//! the changes overlapping its active window, handed to an external reasoner.

use std::collections::HashSet;
use std::sync::Arc;

use alertdesk_repository::{AlertStore, ChangeStore, GraphStore};
use alertdesk_shared::{
    AlertId, Change, RcaContext, RcaEdge, RcaGraphPayload, RcaNode,
};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use crate::config::DeskConfig;
use crate::context::{place, ContextLoader};
use crate::errors::DeskError;

pub use crate::context::hop_distances;

pub const AFFECTS_ENTITY: &str = "AFFECTS_ENTITY";
pub const AFFECTS: &str = "AFFECTS";
pub const TEMPORAL_OVERLAP: &str = "TEMPORAL_OVERLAP";

fn entity_id(name: &str) -> String {
    format!("entity:{}", name)
}

fn attributes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Nodes and edges in insertion order, each kept once.
#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<RcaNode>,
    node_ids: HashSet<String>,
    edges: Vec<RcaEdge>,
    edge_keys: HashSet<(String, String, String)>,
}

impl GraphBuilder {
    fn node(&mut self, id: String, node_type: &str, attributes: Map<String, Value>) {
        if self.node_ids.insert(id.clone()) {
            self.nodes.push(RcaNode {
                id,
                node_type: node_type.to_string(),
                attributes,
            });
        }
    }

    fn entity(&mut self, name: &str, extra: Value) {
        let mut attrs = attributes(json!({ "name": name }));
        attrs.extend(attributes(extra));
        self.node(entity_id(name), "entity", attrs);
    }

    fn edge(&mut self, from: String, to: String, edge_type: &str, attributes: Option<Map<String, Value>>) {
        let key = (from.clone(), to.clone(), edge_type.to_string());
        if self.edge_keys.insert(key) {
            self.edges.push(RcaEdge {
                from,
                to,
                edge_type: edge_type.to_string(),
                attributes,
            });
        }
    }
}

fn change_attributes(change: &Change, scope: &str, hop_distance: u32) -> Map<String, Value> {
    attributes(json!({
        "change_id": change.change_id,
        "name": change.name,
        "change_type": change.change_type,
        "status": change.status,
        "implemented_by": change.implemented_by,
        "start_time": change.start_time,
        "end_time": change.end_time,
        "scope": scope,
        "hop_distance": hop_distance,
    }))
}

pub struct RcaAssembler {
    loader: ContextLoader,
}

impl RcaAssembler {
    /// `graph` is optional: without it the payload carries only the alert, its
    /// root entity and direct changes.
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        graph: Option<Arc<dyn GraphStore>>,
        changes: Arc<dyn ChangeStore>,
        config: DeskConfig,
    ) -> Self {
        Self {
            loader: ContextLoader {
                alerts,
                graph,
                changes,
                config,
            },
        }
    }

    #[instrument(skip(self))]
    pub async fn assemble(&self, id: AlertId) -> Result<RcaGraphPayload, DeskError> {
        let ctx = self.loader.load(id).await?;
        let alert_ref = ctx.alert.display_id();
        let alert_node = format!("alert:{}", alert_ref);

        let mut graph = GraphBuilder::default();
        graph.node(
            alert_node.clone(),
            "alert",
            attributes(json!({
                "summary": ctx.alert.summary,
                "severity": ctx.alert.severity,
                "start_time": ctx.alert.first_seen,
                "status": ctx.alert.status,
            })),
        );
        graph.entity(&ctx.root, json!({ "is_root": true, "hop_distance": 0 }));

        if let Some(hood) = &ctx.neighborhood {
            for node in &hood.nodes {
                let mut extra = json!({});
                if let Some(hop) = ctx.hops.get(&node.name) {
                    extra["hop_distance"] = json!(hop);
                }
                if let Some(owner) = &node.support_owner {
                    extra["support_owner"] = json!(owner);
                }
                graph.entity(&node.name, extra);
            }
            for edge in &hood.edges {
                graph.edge(entity_id(&edge.source), entity_id(&edge.target), &edge.rel_type, None);
            }
        }
        graph.edge(alert_node.clone(), entity_id(&ctx.root), AFFECTS_ENTITY, None);

        for change in &ctx.changes {
            let Some(placement) = place(change, &ctx.root, &ctx.hops) else {
                warn!(change = %change.change_id, "Change touches no discovered entity, skipping");
                continue;
            };
            let change_node = format!("change:{}", change.change_id);
            graph.node(
                change_node.clone(),
                "change",
                change_attributes(change, placement.scope.as_str(), placement.hop_distance),
            );
            graph.edge(change_node.clone(), entity_id(&placement.entity), AFFECTS, None);
            graph.edge(
                change_node,
                alert_node.clone(),
                TEMPORAL_OVERLAP,
                Some(attributes(json!({
                    "overlap_type": change.overlap_with(ctx.alert.first_seen).as_str(),
                }))),
            );
        }

        info!(
            alert = %alert_ref,
            root = %ctx.root,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Assembled RCA graph"
        );
        Ok(RcaGraphPayload {
            rca_context: RcaContext {
                alert_id: alert_ref.clone(),
                root_entity_id: ctx.root,
                session_id: alert_ref,
                generated_at: Utc::now(),
            },
            nodes: graph.nodes,
            edges: graph.edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_first_node_and_drops_repeated_edges() {
        let mut graph = GraphBuilder::default();
        graph.entity("db-1", json!({ "is_root": true }));
        graph.entity("db-1", json!({}));
        graph.edge(entity_id("a"), entity_id("db-1"), "USES", None);
        graph.edge(entity_id("a"), entity_id("db-1"), "USES", None);
        graph.edge(entity_id("a"), entity_id("db-1"), "RUNS_ON", None);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].attributes["is_root"], json!(true));
        assert_eq!(graph.edges.len(), 2);
    }
}
