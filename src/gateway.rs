// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Pipeline
//!
//! Outermost to innermost:
//!
//! 1. Request id (`X-Request-Id`, client value kept, else 8 chars of a UUIDv4)
//! 2. HTTP trace span carrying the request id
//! 3. CORS
//! 4. Rate limiter
//! 5. Authentication gate
//! 6. Handlers
//!
//! Rate limiting runs before the gate so abusive traffic never reaches
//! token verification or principal lookup.

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::from_fn_with_state,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use uuid::Uuid;

use crate::{auth::auth_gate_middleware, rate_limit::rate_limit_middleware, state::AppState};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates the first 8 characters of a random UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortRequestId;

impl MakeRequestId for ShortRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let uuid = Uuid::new_v4().simple().to_string();
        HeaderValue::from_str(&uuid[..8]).ok().map(RequestId::new)
    }
}

fn make_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Wrap `routes` in the gateway pipeline.
pub fn apply(routes: Router, state: &AppState) -> Router {
    routes
        .layer(from_fn_with_state(state.gate(), auth_gate_middleware))
        .layer(from_fn_with_state(state.limiter.clone(), rate_limit_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(ShortRequestId))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CorsLayer::permissive()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{self, auth::LoginResponse};
    use crate::auth::TokenCodec;
    use crate::rate_limit::{middleware::TOO_MANY_REQUESTS_MESSAGE, RateLimitConfig};
    use crate::state::test_support::{self, TEST_SECRET};
    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Method, StatusCode},
        response::Response,
        routing::{any, get},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    use axum::http::Request as HttpRequest;

    /// Full pipeline with stand-in business routes behind the gateway.
    async fn app_with(rate_limit: RateLimitConfig) -> (Router, AppState) {
        let state = test_support::state_with(rate_limit).await;
        let business = Router::new()
            .route("/api/v1/properties", get(|| async { "listings" }))
            .route("/api/v1/properties/{id}", any(|| async { "listing" }))
            .route("/api/v1/favorites", get(|| async { "favorites" }));
        let app = apply(api::routes(state.clone()).merge(business), &state);
        (app, state)
    }

    async fn app() -> (Router, AppState) {
        app_with(RateLimitConfig::default()).await
    }

    fn request(method: Method, path: &str, token: Option<&str>) -> Request {
        let mut builder = HttpRequest::builder().method(method).uri(path).header("x-real-ip", "198.51.100.20");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn json_request(path: &str, body: serde_json::Value) -> Request {
        HttpRequest::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    async fn login(app: &Router, username: &str, password: &str) -> LoginResponse {
        let response = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/login",
                serde_json::json!({"username": username, "password": password}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_value(json_body(response).await["data"].clone()).unwrap()
    }

    #[tokio::test]
    async fn garbage_token_is_ignored_on_public_read() {
        let (app, _) = app().await;
        let response = app
            .oneshot(request(Method::GET, "/api/v1/properties", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_on_admin_mutation() {
        let (app, _) = app().await;
        let response = app
            .oneshot(request(Method::PUT, "/api/v1/properties/5", Some("garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = json_body(response).await;
        assert_eq!(body["errors"], "token_invalid");
    }

    #[tokio::test]
    async fn expired_token_on_protected_route_says_so() {
        let (app, _) = app().await;
        let short = TokenCodec::new(TEST_SECRET.as_bytes(), Duration::from_millis(1));
        let token = short.issue("visitor").unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/favorites", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Token expired");
        assert_eq!(body["errors"], "token_expired");

        let public = app
            .oneshot(request(Method::GET, "/api/v1/properties", Some(&token)))
            .await
            .unwrap();
        assert_eq!(public.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unmatched_paths_require_authentication() {
        let (app, _) = app().await;
        let response = app
            .oneshot(request(Method::GET, "/api/v1/unknown", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unmatched_paths_with_valid_token_are_404() {
        let (app, _) = app().await;
        let visitor = login(&app, "visitor", "visitor-pass").await;
        let response = app
            .oneshot(request(Method::GET, "/api/v1/unknown", Some(&visitor.token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn role_is_enforced_after_authentication() {
        let (app, _) = app().await;
        let visitor = login(&app, "visitor", "visitor-pass").await;
        let admin = login(&app, "admin", "admin-pass").await;

        let denied = app
            .clone()
            .oneshot(request(Method::DELETE, "/api/v1/properties/5", Some(&visitor.token)))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        let body = json_body(denied).await;
        assert_eq!(body["message"], "You do not have permission to perform this action");

        let allowed = app
            .oneshot(request(Method::DELETE, "/api/v1/properties/5", Some(&admin.token)))
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_refresh_logout_flow() {
        let (app, _) = app().await;
        let session = login(&app, "visitor", "visitor-pass").await;

        let me = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/auth/me", Some(&session.token)))
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(json_body(me).await["data"]["username"], "visitor");

        let refreshed = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refreshToken": session.refresh_token}),
            ))
            .await
            .unwrap();
        assert_eq!(refreshed.status(), StatusCode::OK);
        let data = json_body(refreshed).await["data"].clone();
        assert_eq!(data["refreshToken"], session.refresh_token.as_str());

        let logged_out = app
            .clone()
            .oneshot(request(Method::POST, "/api/v1/auth/logout", Some(&session.token)))
            .await
            .unwrap();
        assert_eq!(logged_out.status(), StatusCode::OK);
        assert_eq!(json_body(logged_out).await["data"]["revoked"], 1);

        let after = app
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refreshToken": session.refresh_token}),
            ))
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unreadable_login_body_gets_json_envelope() {
        let (app, _) = app().await;
        let malformed = HttpRequest::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"username": "visitor""#))
            .unwrap();

        let response = app.oneshot(malformed).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn refresh_token_can_be_revoked_without_access_token() {
        let (app, _) = app().await;
        let session = login(&app, "visitor", "visitor-pass").await;

        let revoked = app
            .clone()
            .oneshot(json_request(
                "/api/v1/auth/revoke",
                serde_json::json!({"refreshToken": session.refresh_token}),
            ))
            .await
            .unwrap();
        assert_eq!(revoked.status(), StatusCode::OK);
        assert_eq!(json_body(revoked).await["data"]["revoked"], true);

        let after = app
            .oneshot(json_request(
                "/api/v1/auth/refresh",
                serde_json::json!({"refreshToken": session.refresh_token}),
            ))
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn me_without_token_is_401() {
        let (app, _) = app().await;
        let response = app
            .oneshot(request(Method::GET, "/api/v1/auth/me", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rate_limit_runs_before_authentication() {
        let (app, _) = app_with(RateLimitConfig {
            general_capacity: 1,
            ..RateLimitConfig::default()
        })
        .await;

        let first = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/favorites", None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

        let second = app
            .oneshot(request(Method::GET, "/api/v1/favorites", None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(second).await;
        assert_eq!(body["code"], 429);
        assert_eq!(body["message"], TOO_MANY_REQUESTS_MESSAGE);
    }

    #[tokio::test]
    async fn request_id_is_generated_or_echoed() {
        let (app, _) = app().await;

        let generated = app
            .clone()
            .oneshot(request(Method::GET, "/health/live", None))
            .await
            .unwrap();
        let id = generated.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap();
        assert_eq!(id.len(), 8);

        let mut supplied = request(Method::GET, "/health/live", None);
        supplied
            .headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from_static("client-chosen-id"));
        let echoed = app.oneshot(supplied).await.unwrap();
        assert_eq!(echoed.headers().get(REQUEST_ID_HEADER).unwrap(), "client-chosen-id");
    }

    #[tokio::test]
    async fn health_reports_session_store() {
        let (app, _) = app().await;
        let response = app
            .oneshot(request(Method::GET, "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["checks"]["session_store"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_is_public() {
        let (app, _) = app().await;
        let response = app
            .oneshot(request(Method::GET, "/v3/api-docs/openapi.json", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
