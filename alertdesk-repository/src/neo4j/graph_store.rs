use alertdesk_shared::{Neighborhood, TopologyEdge, TopologyNode};
use async_trait::async_trait;
use neo4rs::{Graph, Query};
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::interfaces::GraphStore;

/// Topology reads against Neo4j.
///
/// Nodes are addressed by their `name` property, falling back to `id` for nodes
/// without a name. Relationships are traversed in both directions. Hop bounds are
/// interpolated into the pattern since Cypher cannot parameterize them.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    pub fn new(uri: &str, user: &str, password: &str) -> Result<Self, StoreError> {
        info!("Connecting to Neo4j at {}", uri);
        let graph = Graph::new(uri, user, password)
            .map_err(|e| StoreError::unavailable(format!("neo4j connect failed: {}", e)))?;
        Ok(Self { graph })
    }

    pub fn from_graph(graph: Graph) -> Self {
        Self { graph }
    }
}

fn neighborhood_cypher(max_hops: u32) -> String {
    format!(
        "MATCH (root) WHERE root.name = $root OR root.id = $root \
         WITH root LIMIT 1 \
         MATCH (root)-[*0..{max_hops}]-(n) \
         WITH root, collect(DISTINCT n) AS nodes \
         UNWIND nodes AS a \
         OPTIONAL MATCH (a)-[r]->(b) WHERE b IN nodes \
         WITH root, nodes, collect(DISTINCT r) AS rels \
         RETURN coalesce(root.name, root.id) AS root, \
                [x IN nodes | {{name: coalesce(x.name, x.id), id: x.id, support_owner: x.support_owner}}] AS nodes, \
                [r IN rels | {{source: coalesce(startNode(r).name, startNode(r).id), \
                               target: coalesce(endNode(r).name, endNode(r).id), \
                               type: type(r)}}] AS edges"
    )
}

fn shortest_path_cypher(max_hops: u32) -> String {
    format!(
        "MATCH (a) WHERE a.name = $from OR a.id = $from \
         MATCH (b) WHERE b.name = $to OR b.id = $to \
         MATCH p = shortestPath((a)-[*..{max_hops}]-(b)) \
         RETURN [x IN nodes(p) | coalesce(x.name, x.id)] AS path \
         LIMIT 1"
    )
}

fn decode_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::serialization(format!("neo4j row decode failed: {}", e))
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    async fn neighborhood(
        &self,
        root: &str,
        max_hops: u32,
    ) -> Result<Option<Neighborhood>, StoreError> {
        let query = Query::new(neighborhood_cypher(max_hops)).param("root", root.to_string());
        let mut result = self.graph.execute(query).await?;

        let Some(row) = result.next().await? else {
            return Ok(None);
        };
        let root = row.get::<String>("root").map_err(decode_err)?;
        let nodes = row.get::<Vec<TopologyNode>>("nodes").map_err(decode_err)?;
        let edges = row.get::<Vec<TopologyEdge>>("edges").map_err(decode_err)?;
        debug!(
            root = %root,
            nodes = nodes.len(),
            edges = edges.len(),
            "Fetched neighborhood"
        );

        Ok(Some(Neighborhood { root, nodes, edges }))
    }

    async fn shortest_path(
        &self,
        from: &str,
        to: &str,
        max_hops: u32,
    ) -> Result<Option<Vec<String>>, StoreError> {
        // shortestPath rejects identical endpoints.
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }
        let query = Query::new(shortest_path_cypher(max_hops))
            .param("from", from.to_string())
            .param("to", to.to_string());
        let mut result = self.graph.execute(query).await?;

        match result.next().await? {
            Some(row) => Ok(Some(row.get::<Vec<String>>("path").map_err(decode_err)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_bounds_are_interpolated() {
        assert!(neighborhood_cypher(10).contains("[*0..10]"));
        assert!(shortest_path_cypher(6).contains("[*..6]"));
    }
}
