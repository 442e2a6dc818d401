// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rate limiting middleware for Axum.
//!
//! Runs before authentication. Rejections short-circuit with 429 whatever
//! the path's access level; no `Retry-After` is sent.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use super::{resolve_client_identity, Decision, EndpointClass, RateLimiter};

pub const TOO_MANY_REQUESTS_MESSAGE: &str = "Too many requests. Please try again in 1 minute.";

/// 429 body. Keeps a `code` field rather than the `status` used elsewhere.
#[derive(Debug, Serialize)]
struct RateLimitBody {
    success: bool,
    message: &'static str,
    code: u16,
}

fn too_many_requests() -> Response {
    let body = RateLimitBody {
        success: false,
        message: TOO_MANY_REQUESTS_MESSAGE,
        code: StatusCode::TOO_MANY_REQUESTS.as_u16(),
    };
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

/// Use with `axum::middleware::from_fn_with_state(limiter, rate_limit_middleware)`.
///
/// The transport peer address is read from `ConnectInfo<SocketAddr>` when
/// the server provides it.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = resolve_client_identity(request.headers(), peer);
    let class = EndpointClass::of_path(request.uri().path());

    match limiter.check(&identity, class) {
        Decision::Allowed { .. } => next.run(request).await,
        Decision::Rejected => {
            warn!(
                client = %identity,
                class = %class,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            too_many_requests()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitConfig;
    use axum::{body::Body, body::to_bytes, middleware::from_fn_with_state, routing::get, Router};
    use tower::ServiceExt;

    use axum::http::Request as HttpRequest;

    fn app(search: u32, general: u32) -> Router {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            search_capacity: search,
            general_capacity: general,
            ..RateLimitConfig::default()
        }));
        Router::new()
            .route("/api/v1/properties", get(|| async { "listings" }))
            .route("/api/v1/properties/{id}", get(|| async { "listing" }))
            .layer(from_fn_with_state(limiter, rate_limit_middleware))
    }

    fn request(path: &str, client: &'static str) -> Request {
        HttpRequest::builder()
            .uri(path)
            .header("x-real-ip", client)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn rejects_after_capacity_with_structured_body() {
        let app = app(2, 100);

        for _ in 0..2 {
            let response = app.clone().oneshot(request("/api/v1/properties", "192.0.2.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(request("/api/v1/properties", "192.0.2.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get("retry-after").is_none());

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": TOO_MANY_REQUESTS_MESSAGE,
                "code": 429
            })
        );
    }

    #[tokio::test]
    async fn item_reads_use_general_bucket() {
        let app = app(1, 100);

        let first = app.clone().oneshot(request("/api/v1/properties", "192.0.2.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let item = app.clone().oneshot(request("/api/v1/properties/5", "192.0.2.1")).await.unwrap();
        assert_eq!(item.status(), StatusCode::OK);

        let second = app.oneshot(request("/api/v1/properties", "192.0.2.1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let app = app(1, 100);

        let a = app.clone().oneshot(request("/api/v1/properties", "192.0.2.1")).await.unwrap();
        let b = app.oneshot(request("/api/v1/properties", "192.0.2.2")).await.unwrap();

        assert_eq!(a.status(), StatusCode::OK);
        assert_eq!(b.status(), StatusCode::OK);
    }
}
