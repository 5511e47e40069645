//! Alert-centred neighborhood and change discovery shared by the RCA assembler
//! and the related-changes view.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use alertdesk_repository::{
    AlertFilter, AlertStore, ChangeStore, ChangeWindow, GraphStore, StoreError,
};
use alertdesk_shared::{Alert, AlertId, Change, ChangeScope, ChangeStatus, Neighborhood};
use chrono::Utc;
use tracing::{debug, warn};

use crate::config::DeskConfig;
use crate::errors::DeskError;
use crate::timeouts::bounded;

/// Hop distance of every node reachable from `root` over the neighborhood's
/// edges, treated as undirected. The root itself is at distance 0.
pub fn hop_distances(root: &str, hood: &Neighborhood) -> HashMap<String, u32> {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in &hood.edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        adjacency
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    let mut distances = HashMap::from([(root.to_string(), 0)]);
    let mut queue = VecDeque::from([(root, 0u32)]);
    while let Some((node, distance)) = queue.pop_front() {
        for next in adjacency.get(node).into_iter().flatten() {
            if !distances.contains_key(*next) {
                distances.insert(next.to_string(), distance + 1);
                queue.push_back((*next, distance + 1));
            }
        }
    }
    distances
}

/// Where a change touches the alert's topology.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placement {
    pub scope: ChangeScope,
    pub entity: String,
    pub hop_distance: u32,
}

/// Direct when the change affects the root, else the closest affected neighbor
/// (ties broken by name). `None` when it touches nothing discovered.
pub(crate) fn place(change: &Change, root: &str, hops: &HashMap<String, u32>) -> Option<Placement> {
    if change.affects(root) {
        return Some(Placement {
            scope: ChangeScope::Direct,
            entity: root.to_string(),
            hop_distance: 0,
        });
    }
    change
        .affected_entities
        .iter()
        .filter_map(|e| hops.get(e).filter(|d| **d > 0).map(|d| (*d, e)))
        .min()
        .map(|(hop_distance, entity)| Placement {
            scope: ChangeScope::Neighbor,
            entity: entity.clone(),
            hop_distance,
        })
}

/// Everything known around one alert: its neighborhood (when a graph store is
/// reachable) and the eligible changes overlapping its active window.
pub(crate) struct AlertContext {
    pub alert: Alert,
    pub root: String,
    pub neighborhood: Option<Neighborhood>,
    pub hops: HashMap<String, u32>,
    pub changes: Vec<Change>,
}

pub(crate) struct ContextLoader {
    pub alerts: Arc<dyn AlertStore>,
    pub graph: Option<Arc<dyn GraphStore>>,
    pub changes: Arc<dyn ChangeStore>,
    pub config: DeskConfig,
}

impl ContextLoader {
    pub async fn load(&self, id: AlertId) -> Result<AlertContext, DeskError> {
        let alert = bounded(
            "find_alert",
            self.config.point_timeout,
            self.alerts.find_one(&AlertFilter::by_id(id)),
        )
        .await?
        .ok_or_else(|| DeskError::not_found(format!("alert {}", id)))?;

        let neighborhood = self.neighborhood(&alert.entity).await?;
        // The entity may have matched a node by id; continue with its name.
        let root = neighborhood
            .as_ref()
            .map_or_else(|| alert.entity.clone(), |hood| hood.root.clone());
        let hops = match &neighborhood {
            Some(hood) => hop_distances(&hood.root, hood),
            None => HashMap::from([(root.clone(), 0)]),
        };

        let mut entities = vec![root.clone()];
        let mut neighbors: Vec<String> = hops.keys().filter(|n| **n != root).cloned().collect();
        neighbors.sort();
        entities.extend(neighbors);
        let window = ChangeWindow {
            start: alert.first_seen,
            end: alert.clear_time.unwrap_or_else(Utc::now),
        };
        let changes = bounded(
            "find_related_changes",
            self.config.point_timeout,
            self.changes.find_changes_affecting(
                &entities,
                &ChangeStatus::ELIGIBLE,
                window,
                self.config.change_limit,
            ),
        )
        .await?;
        debug!(
            alert = %alert.display_id(),
            entities = entities.len(),
            changes = changes.len(),
            "Loaded alert context"
        );

        Ok(AlertContext {
            alert,
            root,
            neighborhood,
            hops,
            changes,
        })
    }

    /// Neighborhood of the alert's entity. A missing or failing graph store only
    /// drops topology enrichment; a timed-out traversal still fails the request.
    async fn neighborhood(&self, root: &str) -> Result<Option<Neighborhood>, DeskError> {
        let Some(graph) = &self.graph else {
            return Ok(None);
        };
        match bounded(
            "neighborhood",
            self.config.graph_timeout,
            graph.neighborhood(root, self.config.rca_max_hops),
        )
        .await
        {
            Ok(hood) => Ok(hood),
            Err(e @ (StoreError::Unavailable(_) | StoreError::Query(_))) => {
                warn!(root = root, error = %e, "Graph store failed, skipping topology enrichment");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertdesk_shared::{TopologyEdge, TopologyNode};
    use uuid::Uuid;

    fn hood() -> Neighborhood {
        Neighborhood {
            root: "root".to_string(),
            nodes: ["root", "a", "b", "c"].into_iter().map(TopologyNode::named).collect(),
            edges: vec![
                TopologyEdge::new("root", "a", "USES"),
                TopologyEdge::new("b", "a", "RUNS_ON"),
                TopologyEdge::new("root", "c", "USES"),
                TopologyEdge::new("c", "b", "USES"),
            ],
        }
    }

    fn change(affected: &[&str]) -> Change {
        Change {
            id: Uuid::new_v4(),
            change_id: "CHG-7".to_string(),
            name: "patch".to_string(),
            change_type: "deployment".to_string(),
            status: ChangeStatus::InProgress,
            implemented_by: "ops".to_string(),
            affected_entities: affected.iter().map(|s| s.to_string()).collect(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    #[test]
    fn hop_distances_ignore_edge_direction() {
        let hops = hop_distances("root", &hood());
        assert_eq!(hops["root"], 0);
        assert_eq!(hops["a"], 1);
        assert_eq!(hops["c"], 1);
        assert_eq!(hops["b"], 2);
    }

    #[test]
    fn placement_prefers_root_then_closest_neighbor() {
        let hops = hop_distances("root", &hood());

        let direct = place(&change(&["b", "root"]), "root", &hops).unwrap();
        assert_eq!(direct.scope, ChangeScope::Direct);
        assert_eq!(direct.hop_distance, 0);

        let neighbor = place(&change(&["b", "c"]), "root", &hops).unwrap();
        assert_eq!(neighbor.scope, ChangeScope::Neighbor);
        assert_eq!(neighbor.entity, "c");
        assert_eq!(neighbor.hop_distance, 1);

        let tie = place(&change(&["c", "a"]), "root", &hops).unwrap();
        assert_eq!(tie.entity, "a");

        assert!(place(&change(&["elsewhere"]), "root", &hops).is_none());
    }
}
