//! Incident topology around a root entity.
//!
//! The root's neighborhood is overlaid with alerts (and optionally active
//! changes), then pruned to the union of shortest paths connecting the root to
//! every interesting node and interesting nodes to each other. This is a
//! shortest-path-union approximation of a Steiner tree: it may keep a few extra
//! nodes but never disconnects the rendered graph.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use alertdesk_repository::{
    AlertFilter, AlertStore, ChangeStore, ChangeWindow, FindOptions, GraphStore,
};
use alertdesk_shared::{
    Alert, AlertDetail, ChangeDetail, ChangeStatus, SubgraphNode, SubgraphView, TopologyEdge,
    TopologyNode,
};
use chrono::Utc;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument};

use crate::config::DeskConfig;
use crate::errors::DeskError;
use crate::timeouts::bounded;

/// Drop repeated `(source, target, type)` edges, keeping first occurrences in order.
pub fn unique_edges(edges: impl IntoIterator<Item = TopologyEdge>) -> Vec<TopologyEdge> {
    let mut seen = HashSet::new();
    edges
        .into_iter()
        .filter(|e| seen.insert((e.source.clone(), e.target.clone(), e.rel_type.clone())))
        .collect()
}

/// Root-to-interesting pairs followed by every unordered pair of the other
/// interesting nodes. An alerting root is only paired once with each node.
fn path_pairs(root: &str, interesting: &[String]) -> Vec<(String, String)> {
    let others: Vec<&String> = interesting.iter().filter(|n| n.as_str() != root).collect();
    let mut pairs: Vec<(String, String)> = others
        .iter()
        .map(|n| (root.to_string(), n.to_string()))
        .collect();
    for (i, a) in others.iter().enumerate() {
        for b in &others[i + 1..] {
            if a != b {
                pairs.push((a.to_string(), b.to_string()));
            }
        }
    }
    pairs
}

pub struct SubgraphExtractor {
    alerts: Arc<dyn AlertStore>,
    graph: Arc<dyn GraphStore>,
    changes: Option<Arc<dyn ChangeStore>>,
    config: DeskConfig,
}

impl SubgraphExtractor {
    pub fn new(alerts: Arc<dyn AlertStore>, graph: Arc<dyn GraphStore>, config: DeskConfig) -> Self {
        Self {
            alerts,
            graph,
            changes: None,
            config,
        }
    }

    /// Enable the active-change overlay.
    pub fn with_changes(mut self, changes: Arc<dyn ChangeStore>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Build the incident topology for `root` (a node name or id).
    #[instrument(skip(self))]
    pub async fn build(&self, root: &str, include_changes: bool) -> Result<SubgraphView, DeskError> {
        let root = root.trim();
        if root.is_empty() {
            return Err(DeskError::validation("root entity name is required"));
        }

        let hood = bounded(
            "neighborhood",
            self.config.graph_timeout,
            self.graph.neighborhood(root, self.config.subgraph_max_hops),
        )
        .await?
        .ok_or_else(|| DeskError::not_found(format!("root entity {}", root)))?;
        debug!(nodes = hood.nodes.len(), edges = hood.edges.len(), "Neighborhood discovered");

        let alerts = self.node_alerts(&hood.nodes).await?;
        let mut changes = if include_changes {
            self.node_changes(&hood.nodes).await?
        } else {
            HashMap::new()
        };

        let interesting: Vec<String> = hood
            .nodes
            .iter()
            .map(|n| n.name.clone())
            .filter(|name| {
                alerts.get(name).is_some_and(|a| !a.is_empty())
                    || changes.get(name).is_some_and(|c| !c.is_empty())
            })
            .collect();

        let pairs = path_pairs(&hood.root, &interesting);
        let paths: Vec<Option<Vec<String>>> = stream::iter(pairs)
            .map(|(from, to)| async move {
                bounded(
                    "shortest_path",
                    self.config.graph_timeout,
                    self.graph
                        .shortest_path(&from, &to, self.config.path_max_hops),
                )
                .await
            })
            .buffer_unordered(self.config.path_concurrency.max(1))
            .try_collect()
            .await?;

        let mut include: HashSet<String> = interesting.iter().cloned().collect();
        include.extend(paths.into_iter().flatten().flatten());

        let known: HashMap<&str, &TopologyNode> =
            hood.nodes.iter().map(|n| (n.name.as_str(), n)).collect();
        let mut nodes: BTreeMap<String, SubgraphNode> = BTreeMap::new();
        for name in &include {
            let node_alerts = alerts.get(name).map(Vec::as_slice).unwrap_or_default();
            nodes.insert(
                name.clone(),
                SubgraphNode {
                    name: name.clone(),
                    has_alert: !node_alerts.is_empty(),
                    severity: node_alerts.iter().filter_map(|a| a.severity).max(),
                    support_owner: known.get(name.as_str()).and_then(|n| n.support_owner.clone()),
                    alerts: node_alerts.iter().map(AlertDetail::from).collect(),
                    changes: changes.remove(name).unwrap_or_default(),
                },
            );
        }

        let edges = unique_edges(
            hood.edges
                .iter()
                .filter(|e| include.contains(&e.source) && include.contains(&e.target))
                .cloned(),
        );

        info!(
            root = %hood.root,
            interesting = interesting.len(),
            nodes = nodes.len(),
            edges = edges.len(),
            "Built incident subgraph"
        );
        Ok(SubgraphView {
            root: hood.root,
            nodes: nodes.into_values().collect(),
            edges,
        })
    }

    async fn node_alerts(
        &self,
        nodes: &[TopologyNode],
    ) -> Result<HashMap<String, Vec<Alert>>, DeskError> {
        let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
        let found: Vec<(String, Vec<Alert>)> = stream::iter(names)
            .map(|name| async move {
                let filter = AlertFilter::attached_to(name.as_str());
                let alerts = bounded(
                    "find_node_alerts",
                    self.config.point_timeout,
                    self.alerts.find_many(&filter, FindOptions::default()),
                )
                .await?;
                Ok::<_, DeskError>((name, alerts))
            })
            .buffered(self.config.path_concurrency.max(1))
            .try_collect()
            .await?;
        Ok(found.into_iter().collect())
    }

    /// Active changes per node name. Empty when no change store is wired.
    async fn node_changes(
        &self,
        nodes: &[TopologyNode],
    ) -> Result<HashMap<String, Vec<ChangeDetail>>, DeskError> {
        let Some(store) = &self.changes else {
            return Ok(HashMap::new());
        };
        let names: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
        let now = Utc::now();
        let active = bounded(
            "find_active_changes",
            self.config.point_timeout,
            store.find_changes_affecting(
                &names,
                &ChangeStatus::ELIGIBLE,
                ChangeWindow { start: now, end: now },
                self.config.change_limit,
            ),
        )
        .await?;

        let mut by_node: HashMap<String, Vec<ChangeDetail>> = HashMap::new();
        for change in &active {
            for name in names.iter().filter(|n| change.affects(n)) {
                by_node
                    .entry(name.clone())
                    .or_default()
                    .push(ChangeDetail::from(change));
            }
        }
        Ok(by_node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_edges_is_idempotent_and_keeps_first_occurrence() {
        let edges = vec![
            TopologyEdge::new("a", "b", "USES"),
            TopologyEdge::new("b", "c", "USES"),
            TopologyEdge::new("a", "b", "USES"),
            TopologyEdge::new("a", "b", "RUNS_ON"),
        ];
        let once = unique_edges(edges);
        assert_eq!(
            once,
            vec![
                TopologyEdge::new("a", "b", "USES"),
                TopologyEdge::new("b", "c", "USES"),
                TopologyEdge::new("a", "b", "RUNS_ON"),
            ]
        );
        assert_eq!(unique_edges(once.clone()), once);
    }

    #[test]
    fn path_pairs_query_each_pair_once_when_root_alerts() {
        let interesting = vec!["root".to_string(), "b".to_string(), "d".to_string()];
        let pairs = path_pairs("root", &interesting);
        assert_eq!(
            pairs,
            vec![
                ("root".to_string(), "b".to_string()),
                ("root".to_string(), "d".to_string()),
                ("b".to_string(), "d".to_string()),
            ]
        );
    }
}
