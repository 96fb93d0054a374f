pub mod config;
pub mod db;
pub mod entries;
pub mod error;
pub mod graph;
pub mod http;

pub use config::Config;
pub use error::{JournalGraphError, Result};
pub use graph::{RelationEdge, RelationType};
