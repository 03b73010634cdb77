//! Client identification utilities
//!
//! Resolves the address a request should be attributed to. Reverse proxies
//! announce the original client through forwarding headers; without them the
//! transport peer address is used.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::SocketAddr;

/// Header set by most reverse proxies and load balancers.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Header set by nginx-style proxies.
pub const X_REAL_IP: &str = "x-real-ip";

/// Resolve the client address for a request.
///
/// Priority order:
/// 1. `X-Forwarded-For`, taken verbatim (a comma separated chain is kept
///    as one value, so the whole chain forms the identity)
/// 2. `X-Real-IP`
/// 3. The transport peer address, rendered as `ip:port`
///
/// Empty header values are skipped. Bytes that are not valid UTF-8 are
/// replaced with U+FFFD rather than dropping the header.
///
/// ## Returns
/// `None` when no header is usable and no peer address is known.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_value(headers, X_FORWARDED_FOR)
        .or_else(|| header_value(headers, X_REAL_IP))
        .or_else(|| peer.map(|addr| addr.to_string()))
}

/// Peer address recorded by `into_make_service_with_connect_info`.
pub fn peer_addr<B>(req: &Request<B>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0)
}

/// [`client_address`] for a full request.
pub fn request_client_address<B>(req: &Request<B>) -> Option<String> {
    client_address(req.headers(), peer_addr(req))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .filter(|v| !v.is_empty())
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}
