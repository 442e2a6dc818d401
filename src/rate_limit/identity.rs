// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client identity for rate limiting.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Set by Cloudflare; used verbatim.
pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

const UNKNOWN: &str = "unknown";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Resolve the identity a request is counted against.
///
/// Precedence, first non-empty wins:
/// `CF-Connecting-IP` > first hop of `X-Forwarded-For` > `X-Real-IP` >
/// transport peer address.
pub fn resolve_client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header(headers, CF_CONNECTING_IP) {
        return ip.to_string();
    }

    let first_hop = header(headers, X_FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());
    if let Some(ip) = first_hop {
        return ip.to_string();
    }

    if let Some(ip) = header(headers, X_REAL_IP) {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
