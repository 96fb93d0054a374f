//! Connectivity ranking: which of a user's entries sit at the center of
//! their relation graph.

use crate::db::Db;
use crate::entries::{preview_of, EntrySummary};
use crate::error::{JournalGraphError, Result};
use rusqlite::params;
use serde::Serialize;

/// An entry together with its relation degree.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedEntry {
    pub entry: EntrySummary,
    pub outgoing_count: usize,
    pub incoming_count: usize,
    pub total_connections: usize,
}

/// Top `limit` entries of a user by total degree (outgoing + incoming),
/// entries with zero connections excluded. Ties break by entry creation
/// time, then id, so the ordering is deterministic.
pub async fn most_connected(db: &Db, user_id: &str, limit: usize) -> Result<Vec<ConnectedEntry>> {
    let user_id = user_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, entry_type, content, created_at, outgoing_count, incoming_count \
             FROM ( \
                 SELECT e.id, e.entry_type, e.content, e.created_at, \
                        (SELECT COUNT(*) FROM entry_relations r WHERE r.from_entry_id = e.id) AS outgoing_count, \
                        (SELECT COUNT(*) FROM entry_relations r WHERE r.to_entry_id = e.id) AS incoming_count \
                 FROM entries e \
                 WHERE e.user_id = ?1 \
             ) \
             WHERE outgoing_count + incoming_count > 0 \
             ORDER BY outgoing_count + incoming_count DESC, created_at ASC, id ASC \
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            let content: String = row.get(2)?;
            let outgoing: i64 = row.get(4)?;
            let incoming: i64 = row.get(5)?;
            Ok(ConnectedEntry {
                entry: EntrySummary {
                    id: row.get(0)?,
                    entry_type: row.get(1)?,
                    preview: preview_of(&content),
                    created_at: row.get(3)?,
                },
                outgoing_count: outgoing as usize,
                incoming_count: incoming as usize,
                total_connections: (outgoing + incoming) as usize,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(JournalGraphError::Database)?);
        }
        Ok(out)
    })
    .await
}
