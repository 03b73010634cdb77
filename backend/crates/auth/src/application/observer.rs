//! Rejection observers
//!
//! The gate reports every rejection with its internal reason. Clients never
//! see the reason; metric backends implement [`AuthObserver`] to count them.

use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RejectReason {
    #[display("missing_header")]
    MissingHeader,
    #[display("invalid_scheme")]
    InvalidScheme,
    #[display("empty_token")]
    EmptyToken,
    #[display("expired")]
    Expired,
    #[display("invalid")]
    Invalid,
}

impl RejectReason {
    pub const ALL: [RejectReason; 5] = [
        RejectReason::MissingHeader,
        RejectReason::InvalidScheme,
        RejectReason::EmptyToken,
        RejectReason::Expired,
        RejectReason::Invalid,
    ];
}

pub trait AuthObserver: Send + Sync {
    fn on_rejection(&self, reason: RejectReason);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthObserver;

impl AuthObserver for NoopAuthObserver {
    fn on_rejection(&self, _reason: RejectReason) {}
}
