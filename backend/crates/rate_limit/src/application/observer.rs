//! Decision observers
//!
//! The limiter reports every outcome here. Metric backends implement
//! [`RateLimitObserver`]; the limiter itself knows nothing about them.

use std::fmt;

use crate::domain::scope::RateLimitScope;

/// What happened to one request at one limiter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Allowed,
    Denied,
    /// Limiting was skipped because the key or the store failed
    Bypassed,
}

impl Outcome {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied => "denied",
            Outcome::Bypassed => "bypassed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub trait RateLimitObserver: Send + Sync {
    fn on_decision(&self, scope: RateLimitScope, outcome: Outcome);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RateLimitObserver for NoopObserver {
    fn on_decision(&self, _scope: RateLimitScope, _outcome: Outcome) {}
}
