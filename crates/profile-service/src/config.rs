//! Configuration for profiled.
//!
//! Sources, lowest priority first: built-in defaults, an optional YAML/TOML
//! file, `PROFILE_`-prefixed environment variables (`__` separates nested
//! keys, e.g. `PROFILE_DATABASE__HOST`). CLI flags are applied on top by the
//! binary.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Application environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnvType {
    /// Human-readable logs at debug level.
    #[default]
    Local,
    /// JSON logs at debug level.
    Develop,
    /// JSON logs at info level.
    Prod,
}

impl EnvType {
    pub fn default_log_level(self) -> &'static str {
        match self {
            Self::Local | Self::Develop => "debug",
            Self::Prod => "info",
        }
    }

    pub fn json_logs(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Postgres,
    /// Process-local table, for development and tests.
    Memory,
}

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub env: EnvType,

    #[serde(default)]
    pub grpc: GrpcConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub storage: StorageKind,

    /// Overrides the environment's default log level.
    #[serde(default)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_postgres")]
    pub username: String,

    #[serde(default = "default_postgres")]
    pub password: String,

    #[serde(default = "default_postgres")]
    pub dbname: String,

    #[serde(default = "default_pool_size")]
    pub max_connections: u32,

    #[serde(default = "default_connection_timeout")]
    pub connect_timeout_secs: u64,

    /// Create the `profile` table on startup when missing.
    #[serde(default = "default_true")]
    pub ensure_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            username: default_postgres(),
            password: default_postgres(),
            dbname: default_postgres(),
            max_connections: default_pool_size(),
            connect_timeout_secs: default_connection_timeout(),
            ensure_schema: true,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL (TLS disabled).
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.username, self.password, self.host, self.port, self.dbname
        )
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 443))
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration; when `path` is given the file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PROFILE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn log_filter(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| self.env.default_log_level().to_string())
    }
}
