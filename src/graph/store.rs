//! Persistence for relation edges. CRUD only — no graph logic lives here.

use crate::db::Db;
use crate::error::{JournalGraphError, Result};
use crate::graph::{RelationEdge, RelationType};
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use uuid::Uuid;

/// Edges touching one entry, split by direction.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRelations {
    pub incoming: Vec<RelationEdge>,
    pub outgoing: Vec<RelationEdge>,
}

/// Insert a new edge. The store assigns id and created_at; the caller is
/// responsible for endpoint validation and ownership checks.
pub async fn create_edge(
    db: &Db,
    from_entry_id: &str,
    to_entry_id: &str,
    relation_type: RelationType,
    description: Option<String>,
) -> Result<RelationEdge> {
    let edge = RelationEdge {
        id: Uuid::new_v4().to_string(),
        from_entry_id: from_entry_id.to_string(),
        to_entry_id: to_entry_id.to_string(),
        relation_type,
        description,
        created_at: Utc::now(),
    };
    let row = edge.clone();
    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO entry_relations (id, from_entry_id, to_entry_id, relation_type, description, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.from_entry_id,
                row.to_entry_id,
                row.relation_type.as_str(),
                row.description,
                row.created_at,
            ],
        )?;
        Ok(())
    })
    .await?;
    Ok(edge)
}

/// Hard-delete an edge. Returns false when no row matched.
pub async fn delete_edge(db: &Db, edge_id: &str) -> Result<bool> {
    let edge_id = edge_id.to_string();
    db.with_connection(move |conn| {
        let affected = conn.execute("DELETE FROM entry_relations WHERE id = ?1", params![edge_id])?;
        Ok(affected > 0)
    })
    .await
}

/// Look up a single edge by id.
pub async fn find_edge(db: &Db, edge_id: &str) -> Result<Option<RelationEdge>> {
    let edge_id = edge_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&select_sql("WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![edge_id], row_to_edge)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(JournalGraphError::Database)?)),
            None => Ok(None),
        }
    })
    .await
}

/// Edges leaving an entry (entry is the `from` endpoint).
pub async fn outgoing_edges(db: &Db, entry_id: &str) -> Result<Vec<RelationEdge>> {
    edges_where(db, "WHERE from_entry_id = ?1", entry_id).await
}

/// Edges arriving at an entry (entry is the `to` endpoint).
pub async fn incoming_edges(db: &Db, entry_id: &str) -> Result<Vec<RelationEdge>> {
    edges_where(db, "WHERE to_entry_id = ?1", entry_id).await
}

/// Both edge directions around one entry.
pub async fn edges_touching(db: &Db, entry_id: &str) -> Result<EntryRelations> {
    Ok(EntryRelations {
        incoming: incoming_edges(db, entry_id).await?,
        outgoing: outgoing_edges(db, entry_id).await?,
    })
}

/// All edges whose `from` endpoint belongs to the user. Ownership is resolved
/// by joining the entries table; the store itself has no notion of users.
pub async fn all_edges_for_user(db: &Db, user_id: &str) -> Result<Vec<RelationEdge>> {
    let user_id = user_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT r.id, r.from_entry_id, r.to_entry_id, r.relation_type, r.description, r.created_at \
             FROM entry_relations r \
             JOIN entries e ON e.id = r.from_entry_id \
             WHERE e.user_id = ?1 \
             ORDER BY r.created_at ASC, r.id ASC",
        )?;
        let edges = collect_edges(stmt.query_map(params![user_id], row_to_edge)?);
        edges
    })
    .await
}

async fn edges_where(db: &Db, clause: &'static str, entry_id: &str) -> Result<Vec<RelationEdge>> {
    let entry_id = entry_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(&select_sql(clause))?;
        let edges = collect_edges(stmt.query_map(params![entry_id], row_to_edge)?);
        edges
    })
    .await
}

fn select_sql(clause: &str) -> String {
    format!(
        "SELECT id, from_entry_id, to_entry_id, relation_type, description, created_at \
         FROM entry_relations {} ORDER BY created_at ASC, id ASC",
        clause
    )
}

fn collect_edges<F>(rows: rusqlite::MappedRows<'_, F>) -> Result<Vec<RelationEdge>>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<RelationEdge>,
{
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(JournalGraphError::Database)?);
    }
    Ok(out)
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<RelationEdge> {
    let type_str: String = row.get(3)?;
    let relation_type = RelationType::parse(&type_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RelationEdge {
        id: row.get(0)?,
        from_entry_id: row.get(1)?,
        to_entry_id: row.get(2)?,
        relation_type,
        description: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::test_support::{insert_entry, setup_test_db};

    async fn seed_entries(db: &Db) {
        for id in ["a", "b", "c"] {
            insert_entry(db, id, "alice", "dream", &format!("entry {}", id)).await;
        }
        insert_entry(db, "x", "bob", "plan", "bob's entry").await;
    }

    #[tokio::test]
    async fn test_create_and_find_edge() {
        let (db, _temp) = setup_test_db().await;
        seed_entries(&db).await;

        let edge = create_edge(
            &db,
            "a",
            "b",
            RelationType::LedTo,
            Some("the dream set this off".to_string()),
        )
        .await
        .unwrap();

        let found = find_edge(&db, &edge.id).await.unwrap().unwrap();
        assert_eq!(found.from_entry_id, "a");
        assert_eq!(found.to_entry_id, "b");
        assert_eq!(found.relation_type, RelationType::LedTo);
        assert_eq!(found.description.as_deref(), Some("the dream set this off"));
    }

    #[tokio::test]
    async fn test_duplicate_edges_permitted() {
        let (db, _temp) = setup_test_db().await;
        seed_entries(&db).await;

        let e1 = create_edge(&db, "a", "b", RelationType::RelatedTo, None)
            .await
            .unwrap();
        let e2 = create_edge(&db, "a", "b", RelationType::RelatedTo, None)
            .await
            .unwrap();
        assert_ne!(e1.id, e2.id);

        let out = outgoing_edges(&db, "a").await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_edge_idempotent() {
        let (db, _temp) = setup_test_db().await;
        seed_entries(&db).await;

        let edge = create_edge(&db, "a", "b", RelationType::CausedBy, None)
            .await
            .unwrap();
        assert!(delete_edge(&db, &edge.id).await.unwrap());
        assert!(!delete_edge(&db, &edge.id).await.unwrap());
        assert!(find_edge(&db, &edge.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_edges_touching_split_by_direction() {
        let (db, _temp) = setup_test_db().await;
        seed_entries(&db).await;

        create_edge(&db, "a", "b", RelationType::LedTo, None)
            .await
            .unwrap();
        create_edge(&db, "c", "b", RelationType::RemindedOf, None)
            .await
            .unwrap();
        create_edge(&db, "b", "c", RelationType::ResultedIn, None)
            .await
            .unwrap();

        let touching = edges_touching(&db, "b").await.unwrap();
        assert_eq!(touching.incoming.len(), 2);
        assert_eq!(touching.outgoing.len(), 1);
        assert_eq!(touching.outgoing[0].to_entry_id, "c");
    }

    #[tokio::test]
    async fn test_all_edges_for_user_joins_ownership() {
        let (db, _temp) = setup_test_db().await;
        seed_entries(&db).await;

        create_edge(&db, "a", "b", RelationType::LedTo, None)
            .await
            .unwrap();
        // Edge originating from bob's entry must not show up for alice
        create_edge(&db, "x", "b", RelationType::RelatedTo, None)
            .await
            .unwrap();

        let alice_edges = all_edges_for_user(&db, "alice").await.unwrap();
        assert_eq!(alice_edges.len(), 1);
        assert_eq!(alice_edges[0].from_entry_id, "a");

        let bob_edges = all_edges_for_user(&db, "bob").await.unwrap();
        assert_eq!(bob_edges.len(), 1);
    }
}
