use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Deployment configuration
    pub deployment: DeploymentConfig,

    /// Queue backend configuration
    pub queue: QueueConfig,

    /// Store endpoint configuration
    pub store: StoreConfig,

    /// Relay worker configuration
    pub relay: RelaySettings,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from embedded defaults, optional file, and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        let config: Config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: RELAY)
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check required connection settings. Missing values are fatal: the
    /// process must not start with a half-configured pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.queue.name.trim().is_empty() {
            return Err(AppError::Configuration(
                "'queue.name' is required. Set RELAY__QUEUE__NAME or add it to the config file."
                    .to_string(),
            ));
        }

        if self.queue.backend == QueueBackend::Redis
            && self
                .queue
                .redis_url
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(AppError::Configuration(
                "'queue.redis_url' is required for the redis backend. Set RELAY__QUEUE__REDIS_URL."
                    .to_string(),
            ));
        }

        if self.deployment.role.runs_worker()
            && self
                .store
                .base_url
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(AppError::Configuration(
                "'store.base_url' is required for the relay worker. Set RELAY__STORE__BASE_URL."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Which components this process runs
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ingress API and relay worker in one process
    #[default]
    Standalone,
    /// Ingress API only
    Ingress,
    /// Relay worker only
    Worker,
}

impl Role {
    pub fn runs_ingress(&self) -> bool {
        matches!(self, Role::Standalone | Role::Ingress)
    }

    pub fn runs_worker(&self) -> bool {
        matches!(self, Role::Standalone | Role::Worker)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend type
    #[serde(default)]
    pub backend: QueueBackend,

    /// Queue name
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Redis connection string (redis backend only)
    pub redis_url: Option<String>,

    /// Key prefix for the redis backend
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Lease duration for received messages (seconds)
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    /// In-process queue; leases behave like the durable backends but
    /// nothing survives a restart
    #[default]
    Memory,
    /// Redis-backed durable queue
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store service, e.g. "http://localhost:3000"
    pub base_url: Option<String>,

    /// Store request timeout (seconds)
    #[serde(default = "default_store_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Sleep between iterations when the queue is empty (seconds)
    #[serde(default = "default_idle_backoff")]
    pub idle_backoff_secs: u64,

    /// Sleep when the queue is not yet provisioned (seconds)
    #[serde(default = "default_provision_backoff")]
    pub provision_backoff_secs: u64,

    /// Sleep after a transient receive failure (seconds)
    #[serde(default = "default_receive_backoff")]
    pub receive_backoff_secs: u64,

    /// Serve the event-driven worker surface (POST /message, GET /count)
    #[serde(default)]
    pub http_enabled: bool,

    /// Port for the worker surface
    #[serde(default = "default_relay_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_queue_name() -> String {
    "orders".to_string()
}

fn default_key_prefix() -> String {
    "order-relay".to_string()
}

fn default_visibility_timeout() -> u64 {
    30
}

fn default_store_timeout() -> u64 {
    10
}

fn default_idle_backoff() -> u64 {
    5
}

fn default_provision_backoff() -> u64 {
    10
}

fn default_receive_backoff() -> u64 {
    1
}

fn default_relay_http_port() -> u16 {
    8081
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
