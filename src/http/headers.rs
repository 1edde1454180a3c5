//! Hop-by-hop header filtering at the proxy boundary.
//!
//! # Design Decisions
//! - Matching is case-insensitive (header names are case-insensitive in HTTP)
//! - Pure functions over `HeaderMap`, no side effects
//! - Repeated header values are preserved in order

use axum::http::HeaderMap;

/// Inbound headers the outbound transport recomputes itself; forwarding the
/// originals verbatim would desynchronize them from the actual connection.
const INBOUND_STRIP: &[&str] = &["host", "content-length"];

/// Outbound headers describing the upstream's transport framing; they must
/// not leak into the gateway's own response framing.
const OUTBOUND_STRIP: &[&str] = &[
    "content-encoding",
    "content-length",
    "transfer-encoding",
    "connection",
];

/// Filter headers on a request before it is forwarded upstream.
pub fn filter_inbound(headers: &HeaderMap) -> HeaderMap {
    filter(headers, INBOUND_STRIP)
}

/// Filter headers on an upstream response before it is returned to the client.
pub fn filter_outbound(headers: &HeaderMap) -> HeaderMap {
    filter(headers, OUTBOUND_STRIP)
}

fn filter(headers: &HeaderMap, strip: &[&str]) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if strip.iter().any(|s| name.as_str().eq_ignore_ascii_case(s)) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}
