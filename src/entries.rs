//! Entry lookup: the boundary to the journal CRUD layer.
//!
//! The graph engine never writes entries. It uses this module for exactly two
//! things: authorizing access to an entry (existence + ownership in one check,
//! so a miss never reveals whether the entry exists at all) and decorating
//! traversal results with display summaries.

use crate::db::Db;
use crate::error::{JournalGraphError, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Preview length for entry summaries, in characters.
const PREVIEW_CHARS: usize = 100;

/// Display metadata for an entry, opaque to the graph engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: String,
    pub entry_type: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

/// Check that an entry exists and belongs to the given user.
pub async fn exists(db: &Db, entry_id: &str, user_id: &str) -> Result<bool> {
    let entry_id = entry_id.to_string();
    let user_id = user_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare("SELECT 1 FROM entries WHERE id = ?1 AND user_id = ?2")?;
        let found = stmt.exists(params![entry_id, user_id])?;
        Ok(found)
    })
    .await
}

/// Fetch a display summary for one entry, if it exists.
pub async fn summary(db: &Db, entry_id: &str) -> Result<Option<EntrySummary>> {
    let entry_id = entry_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, entry_type, content, created_at FROM entries WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![entry_id], row_to_summary)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(JournalGraphError::Database)?)),
            None => Ok(None),
        }
    })
    .await
}

/// Fetch display summaries for a batch of entry ids in one query.
/// Ids with no matching entry are simply absent from the map.
pub async fn summaries(db: &Db, entry_ids: Vec<String>) -> Result<HashMap<String, EntrySummary>> {
    if entry_ids.is_empty() {
        return Ok(HashMap::new());
    }
    db.with_connection(move |conn| {
        let placeholders = entry_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "SELECT id, entry_type, content, created_at FROM entries WHERE id IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(entry_ids.iter()), row_to_summary)
            .map_err(JournalGraphError::Database)?;
        let mut out = HashMap::new();
        for row in rows {
            let summary = row.map_err(JournalGraphError::Database)?;
            out.insert(summary.id.clone(), summary);
        }
        Ok(out)
    })
    .await
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntrySummary> {
    let content: String = row.get(2)?;
    Ok(EntrySummary {
        id: row.get(0)?,
        entry_type: row.get(1)?,
        preview: preview_of(&content),
        created_at: row.get(3)?,
    })
}

/// First PREVIEW_CHARS characters of the content, ellipsized when truncated.
pub(crate) fn preview_of(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        let cut: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::migrate;
    use std::path::Path;
    use tempfile::TempDir;

    /// Fresh migrated database in a temp directory.
    pub async fn setup_test_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (db, temp_dir)
    }

    /// Insert an entry row directly; tests stand in for the CRUD layer.
    pub async fn insert_entry(db: &Db, id: &str, user_id: &str, entry_type: &str, content: &str) {
        let id = id.to_string();
        let user_id = user_id.to_string();
        let entry_type = entry_type.to_string();
        let content = content.to_string();
        db.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO entries (id, user_id, entry_type, content) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, entry_type, content],
            )?;
            Ok(())
        })
        .await
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{insert_entry, setup_test_db};
    use super::*;

    #[tokio::test]
    async fn test_exists_checks_ownership() {
        let (db, _temp) = setup_test_db().await;
        insert_entry(&db, "e1", "alice", "dream", "flying over water").await;

        assert!(exists(&db, "e1", "alice").await.unwrap());
        // Another user's entry looks exactly like a missing one
        assert!(!exists(&db, "e1", "bob").await.unwrap());
        assert!(!exists(&db, "nope", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_summary_previews_long_content() {
        let (db, _temp) = setup_test_db().await;
        let long = "x".repeat(300);
        insert_entry(&db, "e1", "alice", "thought", &long).await;

        let s = summary(&db, "e1").await.unwrap().unwrap();
        assert_eq!(s.entry_type, "thought");
        assert_eq!(s.preview.chars().count(), 101); // 100 chars + ellipsis
        assert!(s.preview.ends_with('…'));
    }

    #[tokio::test]
    async fn test_summary_missing_entry() {
        let (db, _temp) = setup_test_db().await;
        assert!(summary(&db, "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_summaries_batch() {
        let (db, _temp) = setup_test_db().await;
        insert_entry(&db, "e1", "alice", "dream", "one").await;
        insert_entry(&db, "e2", "alice", "plan", "two").await;

        let map = summaries(
            &db,
            vec!["e1".to_string(), "e2".to_string(), "ghost".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["e2"].entry_type, "plan");
    }
}
