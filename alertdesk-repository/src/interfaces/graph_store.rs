//! Topology graph store trait definition.

use alertdesk_shared::Neighborhood;
use async_trait::async_trait;

use crate::errors::StoreError;

/// Read-only access to the topology graph.
///
/// Traversals are undirected: a relationship connects its endpoints for
/// reachability regardless of its stored direction.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Every node within `max_hops` of the node named (or identified) `root`, plus the
    /// edges induced among them. `None` when no such root exists.
    async fn neighborhood(
        &self,
        root: &str,
        max_hops: u32,
    ) -> Result<Option<Neighborhood>, StoreError>;

    /// Node names along one shortest path from `from` to `to`, both inclusive.
    /// `None` when the nodes are not connected within `max_hops`.
    async fn shortest_path(
        &self,
        from: &str,
        to: &str,
        max_hops: u32,
    ) -> Result<Option<Vec<String>>, StoreError>;
}
