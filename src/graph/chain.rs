//! Bounded, direction-aware chain traversal.
//!
//! Iterative BFS with an explicit queue; each queue item carries the path
//! that led to it, so a cycle is cut the moment a branch would revisit its
//! own ancestry while a diamond (two distinct paths to the same node) is
//! still explored. A separate `seen` set admits each entry into the result
//! at most once, at its shallowest depth.

use crate::db::Db;
use crate::error::{JournalGraphError, Result};
use crate::graph::RelationType;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// Which edge endpoint to expand from at each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainDirection {
    /// Follow edges where the current node is the `from` endpoint.
    Forward,
    /// Follow edges where the current node is the `to` endpoint.
    Backward,
    /// Union of forward and backward expansion per step.
    Both,
}

impl ChainDirection {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "forward" => Ok(ChainDirection::Forward),
            "backward" => Ok(ChainDirection::Backward),
            "both" => Ok(ChainDirection::Both),
            other => Err(JournalGraphError::InvalidInput(format!(
                "unknown chain direction: {} (expected forward, backward or both)",
                other
            ))),
        }
    }
}

/// One entry discovered by the walk.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredEntry {
    pub entry_id: String,
    /// Hop count from the start entry; 0 for the start itself.
    pub depth: usize,
    /// Type of the edge used to reach this entry; None for the start.
    pub relation_type: Option<RelationType>,
}

/// Result of a chain walk, ordered by ascending depth.
#[derive(Debug, Clone, Serialize)]
pub struct ChainWalk {
    pub entries: Vec<DiscoveredEntry>,
    /// Maximum depth observed; 0 when only the start entry was found.
    pub total_depth: usize,
}

/// Entries reachable from `start_entry_id` within `max_depth` hops.
///
/// The depth bound and the per-path cycle cut are what keep this finite on
/// cyclic data; `deadline`, checked between frontier expansions, bounds
/// wall-clock cost on dense graphs where branching^depth gets large.
pub async fn walk(
    db: &Db,
    start_entry_id: &str,
    direction: ChainDirection,
    max_depth: usize,
    deadline: Option<Instant>,
) -> Result<ChainWalk> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize, Option<RelationType>, Vec<String>)> = VecDeque::new();
    let mut entries = Vec::new();
    let mut total_depth = 0;

    queue.push_back((
        start_entry_id.to_string(),
        0,
        None,
        vec![start_entry_id.to_string()],
    ));

    while let Some((entry_id, depth, via, path)) = queue.pop_front() {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(JournalGraphError::DeadlineExceeded(format!(
                    "chain walk from {} exceeded its deadline at depth {}",
                    start_entry_id, depth
                )));
            }
        }

        // BFS pops in nondecreasing depth order, so the first occurrence of
        // an entry is its shallowest and the output stays depth-ordered.
        if seen.insert(entry_id.clone()) {
            total_depth = total_depth.max(depth);
            entries.push(DiscoveredEntry {
                entry_id: entry_id.clone(),
                depth,
                relation_type: via,
            });
        }

        if depth >= max_depth {
            continue;
        }

        for (neighbor, relation_type) in neighbors(db, &entry_id, direction).await? {
            if path.contains(&neighbor) {
                continue;
            }
            let mut next_path = path.clone();
            next_path.push(neighbor.clone());
            queue.push_back((neighbor, depth + 1, Some(relation_type), next_path));
        }
    }

    log::debug!(
        "chain walk from {} ({:?}, max_depth {}): {} entries, total depth {}",
        start_entry_id,
        direction,
        max_depth,
        entries.len(),
        total_depth
    );

    Ok(ChainWalk {
        entries,
        total_depth,
    })
}

/// Adjacent entries of `entry_id` under the chosen direction, with the type
/// of the connecting edge.
async fn neighbors(
    db: &Db,
    entry_id: &str,
    direction: ChainDirection,
) -> Result<Vec<(String, RelationType)>> {
    let entry_id = entry_id.to_string();
    db.with_connection(move |conn| {
        let sql = match direction {
            ChainDirection::Forward => {
                "SELECT to_entry_id, relation_type FROM entry_relations \
                 WHERE from_entry_id = ?1 ORDER BY created_at ASC, id ASC"
            }
            ChainDirection::Backward => {
                "SELECT from_entry_id, relation_type FROM entry_relations \
                 WHERE to_entry_id = ?1 ORDER BY created_at ASC, id ASC"
            }
            ChainDirection::Both => {
                "SELECT to_entry_id, relation_type, created_at, id FROM entry_relations \
                 WHERE from_entry_id = ?1 \
                 UNION ALL \
                 SELECT from_entry_id, relation_type, created_at, id FROM entry_relations \
                 WHERE to_entry_id = ?1 \
                 ORDER BY created_at ASC, id ASC"
            }
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![entry_id], |row| {
            let neighbor: String = row.get(0)?;
            let type_str: String = row.get(1)?;
            Ok((neighbor, type_str))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (neighbor, type_str) = row.map_err(JournalGraphError::Database)?;
            out.push((neighbor, RelationType::parse(&type_str)?));
        }
        Ok(out)
    })
    .await
}
