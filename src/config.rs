//! Harvester configuration
//!
//! Loaded from a TOML file with three tables: `[api]`, `[database]` and
//! `[load]`. Every field has a default, so an empty file is a valid config.

use crate::error::{Error, Result};
use crate::http::{BackoffPolicy, FetcherConfig, RateLimiterConfig};
use crate::types::ExhaustionPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Catalog source used when none is configured
pub const DEFAULT_BASE_URL: &str = "https://public-apis-api.herokuapp.com/api/v1";

/// Schema holding the staging and warehouse tables
pub const DEFAULT_SCHEMA: &str = "github_api_repo";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete harvester configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Catalog source and fetch behaviour
    #[serde(default)]
    pub api: ApiConfig,

    /// Target store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Staging load settings
    #[serde(default)]
    pub load: LoadConfig,
}

impl HarvestConfig {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.api.max_attempts == 0 {
            return Err(Error::invalid_value("api.max_attempts", "must be at least 1"));
        }
        if self.load.chunk_size == 0 {
            return Err(Error::invalid_value("load.chunk_size", "must be at least 1"));
        }
        self.api.base_url()?;

        if !is_identifier(&self.database.schema) {
            return Err(Error::invalid_value(
                "database.schema",
                format!("'{}' is not a plain SQL identifier", self.database.schema),
            ));
        }
        if self.database.engine == DbEngine::Duckdb && self.database.path.trim().is_empty() {
            return Err(Error::invalid_value("database.path", "must not be empty"));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// API Config
// ============================================================================

/// Catalog source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `auth/token` and `apis/...` are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Attempts per page, shared by backoff retries and renewals
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound of the random jitter in milliseconds
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Optional cap on the doubled delay
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// What to do when a page runs out of attempts
    #[serde(default)]
    pub on_exhausted: ExhaustionPolicy,

    /// Optional client-side throttle
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_jitter_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            jitter_ms: default_jitter_ms(),
            max_backoff_ms: None,
            timeout_secs: default_timeout_secs(),
            on_exhausted: ExhaustionPolicy::default(),
            rate_limit: None,
        }
    }
}

impl ApiConfig {
    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("api.base_url", format!("{}: {e}", self.base_url)))
    }

    /// Backoff policy described by this config
    pub fn backoff(&self) -> BackoffPolicy {
        let policy = BackoffPolicy::new(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.jitter_ms),
        );
        match self.max_backoff_ms {
            Some(max) => policy.with_max(Duration::from_millis(max)),
            None => policy,
        }
    }

    /// Fetcher settings described by this config
    pub fn fetcher_config(&self) -> FetcherConfig {
        let builder = FetcherConfig::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .backoff(self.backoff());
        match self.rate_limit {
            Some(limit) => builder.rate_limit(limit).build(),
            None => builder.build(),
        }
    }
}

// ============================================================================
// Database Config
// ============================================================================

/// Store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbEngine {
    /// Native DuckDB file or in-memory database
    #[default]
    Duckdb,
    /// PostgreSQL attached through DuckDB's postgres extension
    Postgres,
    /// MySQL attached through DuckDB's mysql extension
    Mysql,
}

impl DbEngine {
    /// Port used when none is configured
    pub fn default_port(self) -> Option<u16> {
        match self {
            Self::Duckdb => None,
            Self::Postgres => Some(5432),
            Self::Mysql => Some(3306),
        }
    }
}

/// Target store settings. Upper-case `HOST`, `PORT`, `USERNAME` and
/// `PASSWORD` keys are accepted for compatibility with older `db.toml` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Backend engine
    #[serde(default)]
    pub engine: DbEngine,

    /// DuckDB file, or `:memory:`
    #[serde(default = "default_path")]
    pub path: String,

    /// Server host for attached engines
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,

    /// Server port for attached engines
    #[serde(default, alias = "PORT")]
    pub port: Option<u16>,

    /// Login for attached engines
    #[serde(default, alias = "USERNAME")]
    pub username: Option<String>,

    /// Password for attached engines
    #[serde(default, alias = "PASSWORD")]
    pub password: Option<String>,

    /// Database name for attached engines
    #[serde(default, alias = "DATABASE")]
    pub database: Option<String>,

    /// Schema holding the staging and warehouse tables
    #[serde(default = "default_schema")]
    pub schema: String,
}

fn default_path() -> String {
    "catalog.duckdb".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: DbEngine::default(),
            path: default_path(),
            host: default_host(),
            port: None,
            username: None,
            password: None,
            database: None,
            schema: default_schema(),
        }
    }
}

impl DatabaseConfig {
    /// In-memory DuckDB with the default schema
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            ..Self::default()
        }
    }

    /// DuckDB file at `path` with the default schema
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Load Config
// ============================================================================

/// Staging load settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Records per bulk insert
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    100
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = HarvestConfig::from_toml("").unwrap();
        assert_eq!(config, HarvestConfig::default());
        assert_eq!(config.api.max_attempts, 10);
        assert_eq!(config.load.chunk_size, 100);
        assert_eq!(config.database.schema, "github_api_repo");
        assert_eq!(config.api.on_exhausted, ExhaustionPolicy::Fail);
    }

    #[test]
    fn test_full_document() {
        let config = HarvestConfig::from_toml(
            r#"
            [api]
            base_url = "http://localhost:9000/api/v1"
            max_attempts = 4
            initial_backoff_ms = 50
            jitter_ms = 0
            max_backoff_ms = 400
            on_exhausted = "end_of_data"

            [api.rate_limit]
            requests_per_second = 2

            [database]
            engine = "postgres"
            HOST = "db.internal"
            PORT = 6543
            USERNAME = "loader"
            PASSWORD = "secret"
            database = "catalog"

            [load]
            chunk_size = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.api.max_attempts, 4);
        assert_eq!(config.api.on_exhausted, ExhaustionPolicy::EndOfData);
        assert_eq!(config.api.rate_limit, Some(RateLimiterConfig::new(2, 1)));
        assert_eq!(
            config.api.backoff(),
            BackoffPolicy::new(Duration::from_millis(50), Duration::ZERO)
                .with_max(Duration::from_millis(400))
        );

        assert_eq!(config.database.engine, DbEngine::Postgres);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, Some(6543));
        assert_eq!(config.database.username.as_deref(), Some("loader"));
        assert_eq!(config.database.password.as_deref(), Some("secret"));
        assert_eq!(config.load.chunk_size, 25);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let err = HarvestConfig::from_toml("[api]\nmax_attempts = 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "api.max_attempts"));

        let err = HarvestConfig::from_toml("[load]\nchunk_size = 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "load.chunk_size"));

        let err = HarvestConfig::from_toml("[api]\nbase_url = \"not a url\"").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "api.base_url"));

        let err = HarvestConfig::from_toml("[database]\nschema = \"x; DROP\"").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "database.schema"));
    }

    #[test]
    fn test_unknown_engine_is_parse_error() {
        let err = HarvestConfig::from_toml("[database]\nengine = \"oracle\"").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[load]\nchunk_size = 7").unwrap();

        let config = HarvestConfig::from_file(file.path()).unwrap();
        assert_eq!(config.load.chunk_size, 7);

        let err = HarvestConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_engine_default_ports() {
        assert_eq!(DbEngine::Duckdb.default_port(), None);
        assert_eq!(DbEngine::Postgres.default_port(), Some(5432));
        assert_eq!(DbEngine::Mysql.default_port(), Some(3306));
    }
}
