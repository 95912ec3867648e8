//! Caller identification for bid traffic
//!
//! Exchanges usually sit behind a load balancer, so the connection address
//! is the last resort for the device IP.

use std::net::IpAddr;

use axum::http::HeaderMap;
use uuid::Uuid;

/// Header carrying a caller-assigned request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

/// Client IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// connection address. Unparsable header values are skipped.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    header_ip(headers, "x-forwarded-for")
        .or_else(|| header_ip(headers, "x-real-ip"))
        .or(direct_ip)
}

/// Request id from the `X-Request-ID` header, if present and non-blank
pub fn header_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Header id, else `fallback` when non-blank, else a fresh UUID v4
pub fn resolve_request_id(headers: &HeaderMap, fallback: Option<&str>) -> String {
    header_request_id(headers)
        .or_else(|| {
            fallback
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
