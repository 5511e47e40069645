use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use alertdesk_shared::{Neighborhood, TopologyEdge, TopologyNode};
use async_trait::async_trait;

use super::poisoned;
use crate::errors::StoreError;
use crate::interfaces::GraphStore;

#[derive(Default)]
struct Topology {
    nodes: BTreeMap<String, TopologyNode>,
    edges: Vec<TopologyEdge>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl Topology {
    fn resolve_root(&self, root: &str) -> Option<String> {
        if self.nodes.contains_key(root) {
            return Some(root.to_string());
        }
        self.nodes
            .values()
            .find(|n| n.id.as_deref() == Some(root))
            .map(|n| n.name.clone())
    }

    fn neighbors<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a String> {
        self.adjacency.get(node).into_iter().flatten()
    }
}

/// Undirected topology graph answering traversals with breadth-first search.
///
/// Neighbors are visited in name order so paths are deterministic.
#[derive(Default)]
pub struct MemoryGraphStore {
    topology: RwLock<Topology>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: TopologyNode) -> Result<(), StoreError> {
        let mut topology = self.topology.write().map_err(poisoned)?;
        topology.adjacency.entry(node.name.clone()).or_default();
        topology.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Add a typed edge, creating bare endpoint nodes as needed.
    pub fn add_edge(
        &self,
        source: &str,
        target: &str,
        rel_type: &str,
    ) -> Result<(), StoreError> {
        let mut topology = self.topology.write().map_err(poisoned)?;
        for name in [source, target] {
            if !topology.nodes.contains_key(name) {
                topology
                    .nodes
                    .insert(name.to_string(), TopologyNode::named(name));
            }
        }
        topology
            .adjacency
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
        topology
            .adjacency
            .entry(target.to_string())
            .or_default()
            .insert(source.to_string());
        topology
            .edges
            .push(TopologyEdge::new(source, target, rel_type));
        Ok(())
    }

    pub fn from_parts(
        nodes: impl IntoIterator<Item = TopologyNode>,
        edges: impl IntoIterator<Item = TopologyEdge>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for node in nodes {
            store.add_node(node)?;
        }
        for edge in edges {
            store.add_edge(&edge.source, &edge.target, &edge.rel_type)?;
        }
        Ok(store)
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn neighborhood(
        &self,
        root: &str,
        max_hops: u32,
    ) -> Result<Option<Neighborhood>, StoreError> {
        let topology = self.topology.read().map_err(poisoned)?;
        let Some(root) = topology.resolve_root(root) else {
            return Ok(None);
        };

        let mut order = vec![root.clone()];
        let mut depth: HashMap<String, u32> = HashMap::from([(root.clone(), 0)]);
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(current) = queue.pop_front() {
            let d = depth[&current];
            if d >= max_hops {
                continue;
            }
            for next in topology.neighbors(&current) {
                if !depth.contains_key(next) {
                    depth.insert(next.clone(), d + 1);
                    order.push(next.clone());
                    queue.push_back(next.clone());
                }
            }
        }

        let reached: HashSet<&String> = order.iter().collect();
        let nodes = order
            .iter()
            .filter_map(|name| topology.nodes.get(name).cloned())
            .collect();
        let edges = topology
            .edges
            .iter()
            .filter(|e| reached.contains(&e.source) && reached.contains(&e.target))
            .cloned()
            .collect();

        Ok(Some(Neighborhood { root, nodes, edges }))
    }

    async fn shortest_path(
        &self,
        from: &str,
        to: &str,
        max_hops: u32,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let topology = self.topology.read().map_err(poisoned)?;
        let (Some(from), Some(to)) = (topology.resolve_root(from), topology.resolve_root(to))
        else {
            return Ok(None);
        };
        if from == to {
            return Ok(Some(vec![from]));
        }

        let mut previous: HashMap<String, String> = HashMap::new();
        let mut depth: HashMap<String, u32> = HashMap::from([(from.clone(), 0)]);
        let mut queue = VecDeque::from([from.clone()]);
        while let Some(current) = queue.pop_front() {
            let d = depth[&current];
            if d >= max_hops {
                continue;
            }
            for next in topology.neighbors(&current) {
                if depth.contains_key(next) {
                    continue;
                }
                depth.insert(next.clone(), d + 1);
                previous.insert(next.clone(), current.clone());
                if *next == to {
                    let mut path = vec![to.clone()];
                    let mut cursor = &to;
                    while let Some(prev) = previous.get(cursor) {
                        path.push(prev.clone());
                        cursor = prev;
                    }
                    path.reverse();
                    return Ok(Some(path));
                }
                queue.push_back(next.clone());
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> MemoryGraphStore {
        let store = MemoryGraphStore::new();
        store.add_edge("root", "a", "DEPENDS_ON").unwrap();
        store.add_edge("a", "b", "DEPENDS_ON").unwrap();
        store.add_edge("b", "c", "RUNS_ON").unwrap();
        store
    }

    #[tokio::test]
    async fn neighborhood_is_bounded_and_induced() {
        let store = chain();
        let hood = store.neighborhood("root", 2).await.unwrap().unwrap();
        let names: Vec<_> = hood.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "b"]);
        assert_eq!(hood.edges.len(), 2);
        assert!(hood.edges.iter().all(|e| e.target != "c"));
    }

    #[tokio::test]
    async fn neighborhood_of_missing_root_is_none() {
        assert!(chain().neighborhood("nope", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn root_can_be_addressed_by_id() {
        let store = chain();
        store
            .add_node(TopologyNode {
                name: "root".to_string(),
                id: Some("n-1".to_string()),
                support_owner: None,
            })
            .unwrap();
        let hood = store.neighborhood("n-1", 1).await.unwrap().unwrap();
        assert_eq!(hood.root, "root");
    }

    #[tokio::test]
    async fn shortest_path_respects_hop_bound() {
        let store = chain();
        assert_eq!(
            store.shortest_path("root", "c", 6).await.unwrap(),
            Some(vec!["root".into(), "a".into(), "b".into(), "c".into()])
        );
        assert_eq!(store.shortest_path("root", "c", 2).await.unwrap(), None);
        assert_eq!(
            store.shortest_path("c", "root", 6).await.unwrap().map(|p| p.len()),
            Some(4)
        );
    }
}
