use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub journal: JournalConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Service-wide configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Graph traversal tuning.
///
/// The depth bounds are the sole mechanism keeping traversal cost finite on
/// cyclic or densely connected relation graphs, so they are configurable but
/// clamped at load time.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Depth bound for the cycle advisory BFS on relation creation.
    #[serde(default = "default_cycle_check_depth")]
    pub cycle_check_depth: usize,
    /// Chain depth used when the caller does not supply max_depth.
    #[serde(default = "default_chain_depth")]
    pub default_chain_depth: usize,
    /// Hard ceiling on caller-supplied max_depth.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,
    /// Deadline for a single chain traversal, in milliseconds.
    #[serde(default = "default_traversal_timeout_ms")]
    pub traversal_timeout_ms: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cycle_check_depth: default_cycle_check_depth(),
            default_chain_depth: default_chain_depth(),
            max_chain_depth: default_max_chain_depth(),
            traversal_timeout_ms: default_traversal_timeout_ms(),
        }
    }
}

fn default_cycle_check_depth() -> usize {
    20
}

fn default_chain_depth() -> usize {
    10
}

fn default_max_chain_depth() -> usize {
    50
}

fn default_traversal_timeout_ms() -> u64 {
    5000
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_authless")]
    pub authless: bool,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            api_key_env: default_http_api_key_env(),
            allowed_origins: default_allowed_origins(),
            authless: default_authless(),
        }
    }
}

fn default_authless() -> bool {
    false
}

fn default_http_port() -> u16 {
    8080
}

fn default_http_api_key_env() -> String {
    "JOURNALGRAPH_API_KEY".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    // Default empty — set allowed_origins in config.toml for production
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in JOURNALGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("JOURNALGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str).context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.graph.cycle_check_depth == 0 {
            anyhow::bail!("graph.cycle_check_depth must be greater than 0");
        }

        if self.graph.default_chain_depth == 0 {
            anyhow::bail!("graph.default_chain_depth must be greater than 0");
        }

        if self.graph.max_chain_depth == 0 || self.graph.max_chain_depth > 50 {
            anyhow::bail!("graph.max_chain_depth must be between 1 and 50");
        }

        if self.graph.default_chain_depth > self.graph.max_chain_depth {
            anyhow::bail!(
                "graph.default_chain_depth must not exceed graph.max_chain_depth ({})",
                self.graph.max_chain_depth
            );
        }

        if self.graph.traversal_timeout_ms == 0 {
            anyhow::bail!("graph.traversal_timeout_ms must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.journal.db_path
    }
}
