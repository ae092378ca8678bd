//! Client identity resolution for network rate limiting

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use axum::http::HeaderMap;

use crate::constants::headers;

/// Key used when the transport address is unavailable
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the rate-limit key for a request.
///
/// Forwarding headers are honoured only when the direct peer is a private or
/// loopback address, i.e. a reverse proxy on the local network. A public peer
/// is keyed by its own address regardless of what it claims to forward.
pub fn resolve_client_key(remote: Option<SocketAddr>, headers: &HeaderMap) -> String {
    let Some(remote) = remote else {
        return UNKNOWN_CLIENT.to_owned();
    };

    let ip = remote.ip().to_canonical();

    if is_private_or_loopback(ip) {
        if let Some(forwarded) = first_forwarded_for(headers) {
            tracing::trace!(proxy = %ip, client = forwarded, "Using X-Forwarded-For");
            return forwarded.to_owned();
        }
        if let Some(real_ip) = header_str(headers, headers::REAL_IP) {
            tracing::trace!(proxy = %ip, client = real_ip, "Using X-Real-IP");
            return real_ip.to_owned();
        }
    }

    ip.to_string()
}

/// RFC 1918 and loopback IPv4, `::1` and unique-local `fc00::/7` IPv6.
///
/// IPv4-mapped IPv6 addresses are judged by their IPv4 form.
pub fn is_private_or_loopback(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || is_unique_local(v6),
    }
}

const fn is_unique_local(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

fn first_forwarded_for(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, headers::FORWARDED_FOR)?
        .split(',')
        .map(str::trim)
        .find(|entry| !entry.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
