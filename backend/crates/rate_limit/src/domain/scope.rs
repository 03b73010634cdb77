//! Limiting scopes

use std::fmt;
use std::str::FromStr;

use crate::error::RateLimitError;

/// What a bucket is shared by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitScope {
    /// One bucket for the whole service
    Global,
    /// One bucket per client address
    PerClientIp,
    /// One bucket per client address, method and exact path
    PerEndpoint,
}

impl RateLimitScope {
    /// Pipeline order: the cheapest, widest scope first.
    pub const ALL: [RateLimitScope; 3] = [
        RateLimitScope::Global,
        RateLimitScope::PerClientIp,
        RateLimitScope::PerEndpoint,
    ];

    /// Name used in configuration files and metric labels.
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            RateLimitScope::Global => "global",
            RateLimitScope::PerClientIp => "ip",
            RateLimitScope::PerEndpoint => "endpoint",
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RateLimitScope {
    type Err = RateLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(RateLimitScope::Global),
            "ip" => Ok(RateLimitScope::PerClientIp),
            "endpoint" => Ok(RateLimitScope::PerEndpoint),
            other => Err(RateLimitError::UnknownScope(other.to_string())),
        }
    }
}
