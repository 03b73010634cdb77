//! Rate Limit Error Types
//!
//! None of these ever reach a client. The middleware logs them and lets the
//! request through.

use std::time::Duration;
use thiserror::Error;

/// Rate-limit result type alias
pub type RateLimitResult<T> = Result<T, RateLimitError>;

#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Scope name in configuration does not match any known scope
    #[error("Unknown rate limit scope: {0}")]
    UnknownScope(String),

    /// Neither a forwarding header nor a peer address identifies the client
    #[error("Client address unavailable")]
    ClientAddressUnavailable,

    /// Redis unreachable or script failed
    #[error("Failed to execute rate limit script: {0}")]
    Redis(#[from] redis::RedisError),

    /// PostgreSQL unreachable or statement failed
    #[error("Rate limit database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store answered with an unexpected shape
    #[error("Invalid rate limit store result: {0}")]
    MalformedResult(String),

    /// Store did not answer within the configured deadline
    #[error("Rate limit store timed out after {0:?}")]
    Timeout(Duration),
}

impl RateLimitError {
    /// Failures that happen before the store is consulted.
    pub fn is_key_derivation(&self) -> bool {
        matches!(
            self,
            RateLimitError::UnknownScope(_) | RateLimitError::ClientAddressUnavailable
        )
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self, key: Option<&str>) {
        if self.is_key_derivation() {
            tracing::warn!(error = %self, "Rate limit key generation failed, allowing request");
        } else {
            tracing::error!(
                error = %self,
                key = key.unwrap_or_default(),
                "Rate limit check failed, allowing request"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_classification() {
        assert!(RateLimitError::UnknownScope("tenant".into()).is_key_derivation());
        assert!(RateLimitError::ClientAddressUnavailable.is_key_derivation());
        assert!(!RateLimitError::MalformedResult("[]".into()).is_key_derivation());
        assert!(!RateLimitError::Timeout(Duration::from_millis(500)).is_key_derivation());
    }
}
