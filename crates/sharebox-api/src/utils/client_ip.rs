//! Client address resolution for the auth-failure limiter.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Resolve the client address.
///
/// With `trusted_proxy_count` proxies in front, the client is the entry just
/// before the last `trusted_proxy_count` hops of `X-Forwarded-For`. Falls back
/// to `X-Real-IP`, then the socket address, then `"unknown"`.
pub fn client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|chain| from_forwarded_chain(chain, trusted_proxy_count));
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| ip.parse::<IpAddr>().is_ok());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn from_forwarded_chain(chain: &str, trusted_proxy_count: usize) -> Option<String> {
    let hops: Vec<&str> = chain
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let last = hops.len().checked_sub(1)?;
    let position = last.saturating_sub(trusted_proxy_count);

    hops.get(position)
        .filter(|ip| ip.parse::<IpAddr>().is_ok())
        .map(|ip| ip.to_string())
}
