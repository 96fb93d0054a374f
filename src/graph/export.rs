//! Visualization export: a deduplicated node/edge view of a user's relation
//! graph. Single-hop adjacency over the edge set only — the multi-hop
//! sibling of this module is the chain walker.

use crate::db::Db;
use crate::entries;
use crate::entries::EntrySummary;
use crate::error::Result;
use crate::graph::{store, RelationType};
use serde::Serialize;
use std::collections::BTreeSet;

/// One edge record for the visualization layer.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub from_entry_id: String,
    pub to_entry_id: String,
    pub relation_type: RelationType,
    pub description: Option<String>,
}

/// Node/edge view ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: Vec<EntrySummary>,
    pub edges: Vec<GraphEdge>,
}

/// Build the graph view for a user.
///
/// With a focal entry, only edges touching it are kept, but every node
/// attached to a kept edge is emitted — the far endpoint of each focal edge
/// is part of the picture even though it is not the focal entry.
pub async fn build_graph(
    db: &Db,
    user_id: &str,
    focal_entry_id: Option<&str>,
) -> Result<GraphView> {
    let mut edges = store::all_edges_for_user(db, user_id).await?;
    if let Some(focal) = focal_entry_id {
        edges.retain(|e| e.from_entry_id == focal || e.to_entry_id == focal);
    }

    // BTreeSet keeps node order stable across calls
    let mut node_ids = BTreeSet::new();
    for edge in &edges {
        node_ids.insert(edge.from_entry_id.clone());
        node_ids.insert(edge.to_entry_id.clone());
    }

    let mut summaries = entries::summaries(db, node_ids.iter().cloned().collect()).await?;
    let nodes = node_ids
        .iter()
        .filter_map(|id| summaries.remove(id))
        .collect();

    let edges = edges
        .into_iter()
        .map(|e| GraphEdge {
            id: e.id,
            from_entry_id: e.from_entry_id,
            to_entry_id: e.to_entry_id,
            relation_type: e.relation_type,
            description: e.description,
        })
        .collect();

    Ok(GraphView { nodes, edges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::test_support::{insert_entry, setup_test_db};

    async fn seed(db: &Db) {
        for id in ["a", "b", "c", "d"] {
            insert_entry(db, id, "alice", "dream", &format!("entry {}", id)).await;
        }
        store::create_edge(db, "a", "b", RelationType::LedTo, None)
            .await
            .unwrap();
        store::create_edge(db, "c", "d", RelationType::RemindedOf, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_graph_dedupes_nodes() {
        let (db, _temp) = setup_test_db().await;
        seed(&db).await;
        // A second a->b edge must not duplicate nodes
        store::create_edge(&db, "a", "b", RelationType::RelatedTo, None)
            .await
            .unwrap();

        let view = build_graph(&db, "alice", None).await.unwrap();
        assert_eq!(view.nodes.len(), 4);
        assert_eq!(view.edges.len(), 3);
    }

    #[tokio::test]
    async fn test_focal_filter_scopes_edges() {
        let (db, _temp) = setup_test_db().await;
        seed(&db).await;

        let view = build_graph(&db, "alice", Some("a")).await.unwrap();
        let node_ids: Vec<_> = view.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids, vec!["a", "b"]);
        assert_eq!(view.edges.len(), 1);
        assert_eq!(view.edges[0].relation_type, RelationType::LedTo);
    }

    #[tokio::test]
    async fn test_focal_includes_incoming_side() {
        let (db, _temp) = setup_test_db().await;
        seed(&db).await;

        // d is only the `to` endpoint of its edge
        let view = build_graph(&db, "alice", Some("d")).await.unwrap();
        let node_ids: Vec<_> = view.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(node_ids, vec!["c", "d"]);
        assert_eq!(view.edges.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_graph_for_user_without_edges() {
        let (db, _temp) = setup_test_db().await;
        insert_entry(&db, "solo", "carol", "plan", "no links").await;

        let view = build_graph(&db, "carol", None).await.unwrap();
        assert!(view.nodes.is_empty());
        assert!(view.edges.is_empty());
    }
}
