use crate::error::Result;
use serde::{Deserialize, Serialize};

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// State backend configuration
    pub state: StateConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Plain environment variables understood alongside the prefixed ones
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub server_port: Option<String>,
    pub cors_origin: Option<String>,
    pub database_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            server_port: std::env::var("SERVER_PORT").ok().filter(|v| !v.is_empty()),
            cors_origin: std::env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        Self::load_from(&config_path, EnvOverrides::from_env())
    }

    /// Layer defaults, an optional file, prefixed env vars and plain overrides
    pub fn load_from(config_path: &str, overrides: EnvOverrides) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS, config::FileFormat::Toml))
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: INCIDENT_API)
            .add_source(
                config::Environment::with_prefix("INCIDENT_API")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", overrides.server_port)?
            .set_override_option("server.cors_origin", overrides.cors_origin)?
            .set_override_option("state.database_url", overrides.database_url)?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed to call the API from a browser
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// State backend type
    #[serde(default)]
    pub backend: StateBackend,

    /// Connection string for the SQL backend
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Database connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: StateBackend::default(),
            database_url: default_database_url(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_database_url() -> String {
    "sqlite://incidents.db".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
