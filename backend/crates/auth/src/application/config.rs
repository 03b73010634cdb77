//! Application Configuration
//!
//! Configuration for token issuance and validation.

use serde::Deserialize;
use std::time::Duration;

/// Signing secret used when none is configured. Only fit for development.
pub const DEFAULT_SECRET: &str = "boilerplate_secret_key";

/// JWT configuration
///
/// Read from the `jwt` section of the configuration file. TTLs are given in
/// seconds:
///
/// ```json
/// { "issuer": "boilerplate", "secret_key": "...", "access_token_ttl": 3600 }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub secret_key: String,
    #[serde(deserialize_with = "secs")]
    pub access_token_ttl: Duration,
    #[serde(deserialize_with = "secs")]
    pub refresh_token_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "boilerplate".to_string(),
            audience: "boilerplate_audience".to_string(),
            secret_key: DEFAULT_SECRET.to_string(),
            access_token_ttl: Duration::from_secs(3600),   // 1 hour
            refresh_token_ttl: Duration::from_secs(86400), // 24 hours
        }
    }
}

impl JwtConfig {
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    #[inline]
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET
    }
}

fn secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
