//! Configuration module for TourneySync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{EntityTable, StrategyName};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for TourneySync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub conflicts: ConflictsConfig,
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Sync cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Milliseconds between automatic sync cycles.
    pub interval_ms: u64,
    /// Tables pulled each cycle, in pull order.
    pub tables: Vec<String>,
    /// Server column holding the record's last-modified timestamp.
    pub server_timestamp_field: String,
}

/// Conflict resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictsConfig {
    /// Per-table strategy overrides, e.g. `tournaments: server-wins`.
    pub strategies: BTreeMap<String, String>,
    /// Score column checked by the match dispute predicate.
    pub match_score_field: String,
    /// Highest plausible sum of both players' scores in `match_score_field`.
    pub match_expected_total: f64,
}

/// Remote store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the REST endpoint, e.g. `https://project.example.co`.
    pub base_url: String,
    /// API key sent with every request. `None` for unauthenticated servers.
    pub api_key: Option<String>,
    /// Seconds between connectivity probes.
    pub probe_interval_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the replica and change queue.
    pub database_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/tourneysync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("tourneysync")
            .join("config.yaml")
    }

    /// Tables named in `sync.tables`, skipping names that do not parse.
    ///
    /// Unknown names are reported by [`Config::validate`].
    pub fn sync_tables(&self) -> Vec<EntityTable> {
        self.sync
            .tables
            .iter()
            .filter_map(|name| EntityTable::from_str(name).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            tables: EntityTable::ALL.iter().map(|t| t.to_string()).collect(),
            server_timestamp_field: "updated_at".to_string(),
        }
    }
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            strategies: BTreeMap::new(),
            match_score_field: "op".to_string(),
            match_expected_total: 10.0,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: None,
            probe_interval_secs: 15,
            request_timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("tourneysync")
                .join("replica.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.interval_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.interval_ms == 0 {
            errors.push(ValidationError {
                field: "sync.interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.tables.is_empty() {
            errors.push(ValidationError {
                field: "sync.tables".into(),
                message: "at least one table must be synced".into(),
            });
        }
        for name in &self.sync.tables {
            if EntityTable::from_str(name).is_err() {
                errors.push(ValidationError {
                    field: "sync.tables".into(),
                    message: format!("unknown table '{name}'"),
                });
            }
        }
        if self.sync.server_timestamp_field.trim().is_empty() {
            errors.push(ValidationError {
                field: "sync.server_timestamp_field".into(),
                message: "must not be empty".into(),
            });
        }

        // --- conflicts ---
        for (table, strategy) in &self.conflicts.strategies {
            if EntityTable::from_str(table).is_err() {
                errors.push(ValidationError {
                    field: format!("conflicts.strategies.{table}"),
                    message: format!("unknown table '{table}'"),
                });
            }
            if StrategyName::from_str(strategy).is_err() {
                errors.push(ValidationError {
                    field: format!("conflicts.strategies.{table}"),
                    message: format!(
                        "invalid strategy '{}'; valid options: {}",
                        strategy,
                        StrategyName::valid_names()
                    ),
                });
            }
        }
        if self.conflicts.match_score_field.trim().is_empty() {
            errors.push(ValidationError {
                field: "conflicts.match_score_field".into(),
                message: "must not be empty".into(),
            });
        }
        let total = self.conflicts.match_expected_total;
        if total.is_nan() || total <= 0.0 {
            errors.push(ValidationError {
                field: "conflicts.match_expected_total".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.remote.base_url),
            });
        }
        if self.remote.probe_interval_secs == 0 {
            errors.push(ValidationError {
                field: "remote.probe_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use tourneysync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_interval_ms(10_000)
///     .conflict_strategy("tournaments", "server-wins")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_interval_ms(mut self, millis: u64) -> Self {
        self.config.sync.interval_ms = millis;
        self
    }

    pub fn sync_tables(mut self, tables: &[EntityTable]) -> Self {
        self.config.sync.tables = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn sync_server_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.config.sync.server_timestamp_field = field.into();
        self
    }

    // --- conflicts ---

    pub fn conflict_strategy(
        mut self,
        table: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        self.config
            .conflicts
            .strategies
            .insert(table.into(), strategy.into());
        self
    }

    pub fn match_score_field(mut self, field: impl Into<String>) -> Self {
        self.config.conflicts.match_score_field = field.into();
        self
    }

    pub fn match_expected_total(mut self, total: f64) -> Self {
        self.config.conflicts.match_expected_total = total;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.remote.api_key = Some(key.into());
        self
    }

    pub fn remote_probe_interval_secs(mut self, seconds: u64) -> Self {
        self.config.remote.probe_interval_secs = seconds;
        self
    }

    // --- storage ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.storage.database_path = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
