//! The graph engine's operation surface: ownership checks, input validation,
//! cycle advisory attachment and result decoration around the store and the
//! traversal modules. The HTTP layer maps these calls one-to-one onto routes.

use crate::config::GraphConfig;
use crate::db::Db;
use crate::entries;
use crate::entries::EntrySummary;
use crate::error::{JournalGraphError, Result};
use crate::graph::chain::{self, ChainDirection};
use crate::graph::cycle;
use crate::graph::export::{self, GraphView};
use crate::graph::rank::{self, ConnectedEntry};
use crate::graph::store::{self, EntryRelations};
use crate::graph::{RelationEdge, RelationType, MAX_DESCRIPTION_CHARS};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default and ceiling for the most-connected limit parameter.
const DEFAULT_RANK_LIMIT: usize = 10;
const MAX_RANK_LIMIT: usize = 100;

/// A created edge together with its cycle advisory.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRelation {
    pub edge: RelationEdge,
    /// True when the new edge closes a loop through existing relations.
    /// Advisory only; creation succeeded either way.
    pub has_cycle: bool,
}

/// One node of a chain response, decorated for display.
#[derive(Debug, Clone, Serialize)]
pub struct ChainNode {
    pub entry_id: String,
    pub depth: usize,
    pub relation_type: Option<RelationType>,
    pub entry: Option<EntrySummary>,
}

/// Chain walk response.
#[derive(Debug, Clone, Serialize)]
pub struct ChainResponse {
    pub chain: Vec<ChainNode>,
    pub entry_count: usize,
    pub total_depth: usize,
}

/// Entry-relation graph service.
pub struct RelationService {
    db: Db,
    config: GraphConfig,
}

impl RelationService {
    pub fn new(db: Db, config: GraphConfig) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Create a directed relation between two of the caller's entries.
    ///
    /// Sequence: ownership check, cycle advisory read, insert. The three
    /// steps run without a transaction; because duplicate edges are legal
    /// and the cycle flag is advisory, a concurrent create can at worst
    /// leave the flag stale for one response. That window is accepted.
    pub async fn create_relation(
        &self,
        user_id: &str,
        from_entry_id: &str,
        to_entry_id: &str,
        relation_type: &str,
        description: Option<String>,
    ) -> Result<CreatedRelation> {
        if from_entry_id == to_entry_id {
            return Err(JournalGraphError::InvalidInput(
                "an entry cannot relate to itself".to_string(),
            ));
        }

        let relation_type = RelationType::parse(relation_type)?;

        if let Some(ref description) = description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(JournalGraphError::InvalidInput(format!(
                    "description exceeds {} characters",
                    MAX_DESCRIPTION_CHARS
                )));
            }
        }

        self.authorize_entry(from_entry_id, user_id).await?;
        self.authorize_entry(to_entry_id, user_id).await?;

        let has_cycle = cycle::would_close_cycle(
            &self.db,
            from_entry_id,
            to_entry_id,
            self.config.cycle_check_depth,
        )
        .await?;

        let edge = store::create_edge(
            &self.db,
            from_entry_id,
            to_entry_id,
            relation_type,
            description,
        )
        .await?;

        if has_cycle {
            log::info!(
                "relation {} ({} -> {}) closes a cycle",
                edge.id,
                from_entry_id,
                to_entry_id
            );
        }

        Ok(CreatedRelation { edge, has_cycle })
    }

    /// Delete a relation. Ownership is derived transitively through the
    /// edge's `from` entry; a missing edge and someone else's edge are the
    /// same NotFound.
    pub async fn delete_relation(&self, user_id: &str, relation_id: &str) -> Result<()> {
        let edge = store::find_edge(&self.db, relation_id)
            .await?
            .ok_or_else(|| JournalGraphError::NotFound(format!("relation {}", relation_id)))?;

        // Report the relation, not the entry, as missing so edge ids never
        // leak which entries exist.
        if !entries::exists(&self.db, &edge.from_entry_id, user_id).await? {
            return Err(JournalGraphError::NotFound(format!(
                "relation {}",
                relation_id
            )));
        }

        // The edge may have vanished between fetch and delete; edges are
        // immutable so it cannot have been reassigned. NotFound either way.
        if !store::delete_edge(&self.db, relation_id).await? {
            return Err(JournalGraphError::NotFound(format!(
                "relation {}",
                relation_id
            )));
        }
        Ok(())
    }

    /// Incoming and outgoing edges of one entry.
    pub async fn relations_for_entry(
        &self,
        user_id: &str,
        entry_id: &str,
    ) -> Result<EntryRelations> {
        self.authorize_entry(entry_id, user_id).await?;
        store::edges_touching(&self.db, entry_id).await
    }

    /// Bounded chain walk from an entry, decorated with entry summaries.
    pub async fn chain(
        &self,
        user_id: &str,
        entry_id: &str,
        max_depth: Option<usize>,
        direction: ChainDirection,
    ) -> Result<ChainResponse> {
        self.authorize_entry(entry_id, user_id).await?;

        let max_depth = max_depth.unwrap_or(self.config.default_chain_depth);
        if max_depth == 0 || max_depth > self.config.max_chain_depth {
            return Err(JournalGraphError::InvalidInput(format!(
                "max_depth must be between 1 and {}",
                self.config.max_chain_depth
            )));
        }

        let timeout = Duration::from_millis(self.config.traversal_timeout_ms);
        let deadline = Instant::now() + timeout;
        let walk = tokio::time::timeout(
            timeout,
            chain::walk(&self.db, entry_id, direction, max_depth, Some(deadline)),
        )
        .await
        .map_err(|_| {
            JournalGraphError::DeadlineExceeded(format!(
                "chain walk from {} exceeded {}ms",
                entry_id, self.config.traversal_timeout_ms
            ))
        })??;

        let ids: Vec<String> = walk.entries.iter().map(|e| e.entry_id.clone()).collect();
        let mut summaries = entries::summaries(&self.db, ids).await?;

        let chain = walk
            .entries
            .into_iter()
            .map(|e| ChainNode {
                entry: summaries.remove(&e.entry_id),
                entry_id: e.entry_id,
                depth: e.depth,
                relation_type: e.relation_type,
            })
            .collect::<Vec<_>>();

        Ok(ChainResponse {
            entry_count: chain.len(),
            total_depth: walk.total_depth,
            chain,
        })
    }

    /// Top entries by relation degree.
    pub async fn most_connected(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConnectedEntry>> {
        let limit = limit.unwrap_or(DEFAULT_RANK_LIMIT);
        if limit == 0 || limit > MAX_RANK_LIMIT {
            return Err(JournalGraphError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_RANK_LIMIT
            )));
        }
        rank::most_connected(&self.db, user_id, limit).await
    }

    /// Node/edge export, optionally scoped to one focal entry.
    pub async fn graph(&self, user_id: &str, focal_entry_id: Option<&str>) -> Result<GraphView> {
        if let Some(focal) = focal_entry_id {
            self.authorize_entry(focal, user_id).await?;
        }
        export::build_graph(&self.db, user_id, focal_entry_id).await
    }

    async fn authorize_entry(&self, entry_id: &str, user_id: &str) -> Result<()> {
        if entries::exists(&self.db, entry_id, user_id).await? {
            Ok(())
        } else {
            Err(JournalGraphError::NotFound(format!("entry {}", entry_id)))
        }
    }
}
