//! Entry-relation graph engine: edge storage, cycle advisory, bounded chain
//! traversal, connectivity ranking and node/edge export.
//!
//! Edges are plain directed arcs; the semantic direction a relation type
//! carries is documentation for the UI, never consulted by traversal.

pub mod chain;
pub mod cycle;
pub mod export;
pub mod rank;
pub mod service;
pub mod store;

use crate::error::{JournalGraphError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a relation description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Closed set of relation kinds between journal entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    LedTo,
    RemindedOf,
    InspiredBy,
    CausedBy,
    RelatedTo,
    ResultedIn,
}

/// Documentation-only reading direction of a relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticDirection {
    Forward,
    Backward,
    Both,
}

impl RelationType {
    pub const ALL: [RelationType; 6] = [
        RelationType::LedTo,
        RelationType::RemindedOf,
        RelationType::InspiredBy,
        RelationType::CausedBy,
        RelationType::RelatedTo,
        RelationType::ResultedIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::LedTo => "led_to",
            RelationType::RemindedOf => "reminded_of",
            RelationType::InspiredBy => "inspired_by",
            RelationType::CausedBy => "caused_by",
            RelationType::RelatedTo => "related_to",
            RelationType::ResultedIn => "resulted_in",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "led_to" => Ok(RelationType::LedTo),
            "reminded_of" => Ok(RelationType::RemindedOf),
            "inspired_by" => Ok(RelationType::InspiredBy),
            "caused_by" => Ok(RelationType::CausedBy),
            "related_to" => Ok(RelationType::RelatedTo),
            "resulted_in" => Ok(RelationType::ResultedIn),
            other => Err(JournalGraphError::InvalidInput(format!(
                "unknown relation type: {}",
                other
            ))),
        }
    }

    /// How the relation reads in the UI (source entry relative to target).
    pub fn semantic_direction(&self) -> SemanticDirection {
        match self {
            RelationType::LedTo | RelationType::InspiredBy | RelationType::ResultedIn => {
                SemanticDirection::Forward
            }
            RelationType::RemindedOf | RelationType::CausedBy => SemanticDirection::Backward,
            RelationType::RelatedTo => SemanticDirection::Both,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            RelationType::LedTo => "This entry led to the linked entry",
            RelationType::RemindedOf => "This entry reminded me of the linked entry",
            RelationType::InspiredBy => "This entry was inspired by the linked entry",
            RelationType::CausedBy => "This entry was caused by the linked entry",
            RelationType::RelatedTo => "This entry is related to the linked entry",
            RelationType::ResultedIn => "This entry resulted in the linked entry",
        }
    }
}

/// A directed, typed link between two entries of the same user.
/// Immutable once created; changing a relation means delete and recreate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Unique identifier (UUID v4), store-assigned.
    pub id: String,
    pub from_entry_id: String,
    pub to_entry_id: String,
    pub relation_type: RelationType,
    /// Optional free text; no meaning to the engine.
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Static reference data for `getRelationTypes`.
#[derive(Debug, Clone, Serialize)]
pub struct RelationTypeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub direction: SemanticDirection,
}

/// List all relation kinds with their display metadata.
pub fn relation_types() -> Vec<RelationTypeInfo> {
    RelationType::ALL
        .iter()
        .map(|t| RelationTypeInfo {
            name: t.as_str(),
            description: t.describe(),
            direction: t.semantic_direction(),
        })
        .collect()
}
