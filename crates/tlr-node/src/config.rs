//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tlr_core::NetworkConfig;

/// Full configuration for the relay node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TlrConfig {
    /// Settings of the mirrored currency network.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Query defaults and limits.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Where the initial state comes from.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Hop limit for queries that do not set one.
    #[serde(default)]
    pub default_max_hops: Option<usize>,
    /// Per-query time limit in milliseconds. `0` disables it.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Queries searched at the same time.
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// JSON array of trustline snapshots loaded on start.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    /// JSON-lines event log replayed after the snapshot.
    #[serde(default)]
    pub events_path: Option<PathBuf>,
    /// Capacity of the channel feeding the writer task.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_query_timeout_ms() -> u64 {
    2_000
}
fn default_max_concurrent_queries() -> usize {
    4
}
fn default_event_channel_capacity() -> usize {
    256
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_max_hops: None,
            query_timeout_ms: default_query_timeout_ms(),
            max_concurrent_queries: default_max_concurrent_queries(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            events_path: None,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RoutingConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_ms > 0).then(|| Duration::from_millis(self.query_timeout_ms))
    }
}

impl TlrConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: TlrConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.network.validate()?;
        if self.routing.max_concurrent_queries == 0 {
            anyhow::bail!("routing.max_concurrent_queries must be at least 1");
        }
        if self.ingest.event_channel_capacity == 0 {
            anyhow::bail!("ingest.event_channel_capacity must be at least 1");
        }
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => anyhow::bail!("unknown log format {other:?}, expected text or json"),
        }
    }
}
