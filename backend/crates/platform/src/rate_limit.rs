//! Rate Limiting Infrastructure
//!
//! Policy values shared by the limiter crate and the configuration layer.

use serde::Deserialize;
use std::time::Duration;

/// Fixed-window rate limit policy for one scope.
///
/// Resolved once at startup and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Whether this scope's limiter is installed at all
    pub enabled: bool,
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            enabled: true,
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Same limits, but not installed.
    pub fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    /// Window in whole seconds, never less than one.
    ///
    /// Counter stores expire keys with second granularity, so a sub-second
    /// window is rounded up.
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

/// A policy as written in a configuration file.
///
/// Every field is optional; missing fields are taken from the per-scope
/// defaults passed to [`RateLimitPolicyConfig::resolve`]. The window is given
/// in whole seconds:
///
/// ```json
/// { "enabled": true, "requests": 100, "window": 60 }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimitPolicyConfig {
    pub enabled: Option<bool>,
    pub requests: Option<u32>,
    pub window: Option<u64>,
}

impl RateLimitPolicyConfig {
    pub fn resolve(&self, defaults: RateLimitPolicy) -> RateLimitPolicy {
        RateLimitPolicy {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            max_requests: self.requests.unwrap_or(defaults.max_requests),
            window: self
                .window
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_full_config() {
        let config: RateLimitPolicyConfig =
            serde_json::from_str(r#"{"enabled": false, "requests": 50, "window": 30}"#).unwrap();
        let policy = config.resolve(RateLimitPolicy::default());

        assert!(!policy.enabled);
        assert_eq!(policy.max_requests, 50);
        assert_eq!(policy.window, Duration::from_secs(30));
    }

    #[test]
    fn test_resolve_fills_missing_fields() {
        let config: RateLimitPolicyConfig = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        let policy = config.resolve(RateLimitPolicy::new(1000, 60).disabled());

        assert!(policy.enabled);
        assert_eq!(policy.max_requests, 1000);
        assert_eq!(policy.window, Duration::from_secs(60));
    }

    #[test]
    fn test_window_secs_rounds_up_to_one() {
        let policy = RateLimitPolicy {
            window: Duration::from_millis(200),
            ..RateLimitPolicy::default()
        };
        assert_eq!(policy.window_secs(), 1);
        assert_eq!(RateLimitPolicy::new(10, 60).window_secs(), 60);
    }
}
