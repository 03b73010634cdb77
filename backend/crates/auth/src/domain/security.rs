//! Route security metadata
//!
//! Which routes require a bearer token. Routes are identified by method and
//! route template (`/users/{id}`, not `/users/42`), the same string axum
//! reports through `MatchedPath`.

use axum::http::Method;
use derive_more::Display;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum SecurityRequirement {
    /// Anyone may call the route
    #[default]
    #[display("none")]
    None,
    /// `Authorization: Bearer <token>` must carry a valid token
    #[display("bearer")]
    Bearer,
}

impl SecurityRequirement {
    #[inline]
    pub const fn requires_bearer(&self) -> bool {
        matches!(self, SecurityRequirement::Bearer)
    }
}

/// Security table for every route the service exposes.
///
/// Routes not listed require nothing.
#[derive(Debug, Clone, Default)]
pub struct RouteSecurity {
    routes: HashMap<(Method, String), SecurityRequirement>,
}

impl RouteSecurity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `method path` needs a bearer token.
    pub fn bearer(self, method: Method, path: impl Into<String>) -> Self {
        self.with(method, path, SecurityRequirement::Bearer)
    }

    pub fn with(
        mut self,
        method: Method,
        path: impl Into<String>,
        requirement: SecurityRequirement,
    ) -> Self {
        self.routes.insert((method, path.into()), requirement);
        self
    }

    /// Requirement of `method path`.
    ///
    /// axum answers `HEAD` with the `GET` handler, so `HEAD` is looked up
    /// as `GET`.
    pub fn requirement(&self, method: &Method, path: &str) -> SecurityRequirement {
        let method = if *method == Method::HEAD {
            Method::GET
        } else {
            method.clone()
        };

        self.routes
            .get(&(method, path.to_string()))
            .copied()
            .unwrap_or_default()
    }
}
