//! Service configuration
//!
//! One JSON document (see [`platform::config`]) with every field optional.
//! A handful of secrets and connection strings may be overridden from the
//! environment.

use auth::JwtConfig;
use platform::config::{ConfigError, config_path, env_var, load_json};
use platform::rate_limit::{RateLimitPolicy, RateLimitPolicyConfig};
use rate_limit::{RateLimitError, RateLimitScope};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const REDIS_URL_ENV: &str = "REDIS_URL";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
    pub database: DatabaseConfig,
    pub logger: LoggerConfig,
}

impl AppConfig {
    /// Read the file named by `CONFIG_PATH`, then apply environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        let mut config: AppConfig = load_json(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_var(REDIS_URL_ENV) {
            self.redis.url = url;
        }
        if let Some(url) = env_var(DATABASE_URL_ENV) {
            self.database.url = Some(url);
        }
        if let Some(secret) = env_var(JWT_SECRET_ENV) {
            self.jwt.secret_key = secret;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request deadline, seconds
    pub read_timeout: u64,
    /// Grace period for in-flight requests on shutdown, seconds
    pub shutdown_timeout: u64,
    /// Request body limit, bytes
    pub max_request_size: usize,
    pub compression: CompressionConfig,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: MetricsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout: 10,
            shutdown_timeout: 10,
            max_request_size: 10 * 1024 * 1024, // 10 MiB
            compression: CompressionConfig::default(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// gzip level, 1 (fastest) to 9 (smallest)
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    /// Preflight cache lifetime, seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Accept", "Authorization", "Content-Type", "X-CSRF-Token"]
                .map(String::from)
                .to_vec(),
            exposed_headers: vec!["Link".to_string()],
            allow_credentials: false,
            max_age: 300, // 5 minutes
        }
    }
}

/// Where rate-limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Postgres,
    /// Single process only
    Memory,
}

/// `rate_limit` section. Every key other than `backend` and
/// `store_timeout_ms` names a scope.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub backend: StoreBackend,
    pub store_timeout_ms: u64,
    #[serde(flatten)]
    pub scopes: HashMap<String, RateLimitPolicyConfig>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            store_timeout_ms: 500,
            scopes: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    /// Built-in policy of each scope, before the file is applied.
    pub fn default_policy(scope: RateLimitScope) -> RateLimitPolicy {
        match scope {
            RateLimitScope::Global => RateLimitPolicy::new(1000, 60).disabled(),
            RateLimitScope::PerClientIp => RateLimitPolicy::new(100, 60),
            RateLimitScope::PerEndpoint => RateLimitPolicy::new(50, 60).disabled(),
        }
    }

    pub fn policy(&self, scope: RateLimitScope) -> RateLimitPolicy {
        let defaults = Self::default_policy(scope);
        match self.scopes.get(scope.code()) {
            Some(configured) => configured.resolve(defaults),
            None => defaults,
        }
    }

    /// Scope sections that name no known scope. They are never applied.
    pub fn unknown_scopes(&self) -> Vec<RateLimitError> {
        let mut unknown: Vec<RateLimitError> = self
            .scopes
            .keys()
            .filter_map(|name| name.parse::<RateLimitScope>().err())
            .collect();
        unknown.sort_by_key(|e| e.to_string());
        unknown
    }

    pub fn warn_unknown_scopes(&self) {
        for error in self.unknown_scopes() {
            tracing::warn!(error = %error, "Ignoring rate limit configuration section");
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
    pub exclude_paths: Vec<String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
            exclude_paths: vec!["/health".to_string(), "/status".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
