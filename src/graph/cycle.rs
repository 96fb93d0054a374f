//! Cycle advisory for prospective relation edges.
//!
//! Cycles are legal in this graph — a dream can remind of a memory that
//! inspired a plan that leads back to a similar dream. The advisor only
//! reports that a candidate edge would close a loop so the caller can warn
//! the user; it never blocks creation.

use crate::db::Db;
use crate::error::{JournalGraphError, Result};
use rusqlite::params;
use std::collections::{HashSet, VecDeque};

/// Would inserting the edge `(from, to)` close a cycle?
///
/// BFS from `to` along existing forward edges (`from_entry_id ->
/// to_entry_id`); if `from` is reachable, the new edge completes a loop
/// through that path. Bounded by `max_depth` hops so pathological fan-out
/// terminates; an exhausted bound reports no cycle.
pub async fn would_close_cycle(
    db: &Db,
    from_entry_id: &str,
    to_entry_id: &str,
    max_depth: usize,
) -> Result<bool> {
    if from_entry_id == to_entry_id {
        // Self-loop; the service rejects these before insertion
        return Ok(true);
    }

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();

    queue.push_back((to_entry_id.to_string(), 0usize));
    visited.insert(to_entry_id.to_string());

    while let Some((entry_id, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        for target in forward_targets(db, &entry_id).await? {
            if target == from_entry_id {
                log::debug!(
                    "cycle advisory: {} already reachable from {} at depth {}",
                    from_entry_id,
                    to_entry_id,
                    depth + 1
                );
                return Ok(true);
            }
            if visited.insert(target.clone()) {
                queue.push_back((target, depth + 1));
            }
        }
    }

    Ok(false)
}

/// Distinct `to` endpoints of edges leaving an entry.
async fn forward_targets(db: &Db, entry_id: &str) -> Result<Vec<String>> {
    let entry_id = entry_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn
            .prepare("SELECT DISTINCT to_entry_id FROM entry_relations WHERE from_entry_id = ?1")?;
        let rows = stmt.query_map(params![entry_id], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(JournalGraphError::Database)?);
        }
        Ok(out)
    })
    .await
}
