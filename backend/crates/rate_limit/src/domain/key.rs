//! Bucket key derivation

use axum::http::Request;
use std::fmt;

use platform::client::request_client_address;

use crate::domain::scope::RateLimitScope;
use crate::error::{RateLimitError, RateLimitResult};

const KEY_PREFIX: &str = "rate_limit";

/// Identifies one counted bucket in the counter store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// `rate_limit:global`
    pub fn global() -> Self {
        Self(format!("{KEY_PREFIX}:global"))
    }

    /// `rate_limit:ip:<client>`
    pub fn client(client: &str) -> Self {
        Self(format!("{KEY_PREFIX}:ip:{client}"))
    }

    /// `rate_limit:endpoint:<client>:<method>:<path>`
    pub fn endpoint(client: &str, method: &str, path: &str) -> Self {
        Self(format!("{KEY_PREFIX}:endpoint:{client}:{method}:{path}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the bucket key for `scope` from a request.
///
/// The endpoint scope uses the raw request path; `/users/1` and `/users/2`
/// are different buckets.
pub fn derive_key<B>(scope: RateLimitScope, req: &Request<B>) -> RateLimitResult<RateLimitKey> {
    match scope {
        RateLimitScope::Global => Ok(RateLimitKey::global()),
        RateLimitScope::PerClientIp => {
            let client = client_of(req)?;
            Ok(RateLimitKey::client(&client))
        }
        RateLimitScope::PerEndpoint => {
            let client = client_of(req)?;
            Ok(RateLimitKey::endpoint(
                &client,
                req.method().as_str(),
                req.uri().path(),
            ))
        }
    }
}

fn client_of<B>(req: &Request<B>) -> RateLimitResult<String> {
    request_client_address(req).ok_or(RateLimitError::ClientAddressUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_global_key_ignores_request() {
        let key = derive_key(RateLimitScope::Global, &request("GET", "/a")).unwrap();
        assert_eq!(key.as_str(), "rate_limit:global");
    }

    #[test]
    fn test_ip_key_from_forwarded_for() {
        let mut req = request("GET", "/a");
        req.headers_mut()
            .insert("x-forwarded-for", "192.168.1.1".parse().unwrap());

        let key = derive_key(RateLimitScope::PerClientIp, &req).unwrap();
        assert_eq!(key.as_str(), "rate_limit:ip:192.168.1.1");
    }

    #[test]
    fn test_ip_key_from_peer_address() {
        let mut req = request("GET", "/a");
        let peer: SocketAddr = "192.168.1.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));

        let key = derive_key(RateLimitScope::PerClientIp, &req).unwrap();
        assert_eq!(key.as_str(), "rate_limit:ip:192.168.1.1:12345");
    }

    #[test]
    fn test_endpoint_key_uses_exact_path() {
        let mut req = request("POST", "/users/1?verbose=true");
        req.headers_mut()
            .insert("x-real-ip", "10.0.0.9".parse().unwrap());

        let key = derive_key(RateLimitScope::PerEndpoint, &req).unwrap();
        assert_eq!(key.as_str(), "rate_limit:endpoint:10.0.0.9:POST:/users/1");

        let mut other = request("POST", "/users/2");
        other
            .headers_mut()
            .insert("x-real-ip", "10.0.0.9".parse().unwrap());
        assert_ne!(derive_key(RateLimitScope::PerEndpoint, &other).unwrap(), key);
    }

    #[test]
    fn test_missing_client_address() {
        let err = derive_key(RateLimitScope::PerClientIp, &request("GET", "/")).unwrap_err();
        assert!(matches!(err, RateLimitError::ClientAddressUnavailable));

        // the global scope never needs one
        assert!(derive_key(RateLimitScope::Global, &request("GET", "/")).is_ok());
    }
}
