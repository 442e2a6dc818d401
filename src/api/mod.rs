// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth::Role, error::ApiError, gateway, state::AppState};

pub mod auth;
pub mod health;

/// Build the full application: routes, docs and the gateway pipeline.
pub fn router(state: AppState) -> Router {
    gateway::apply(routes(state.clone()), &state)
}

/// Application routes without the gateway pipeline.
pub fn routes(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/revoke", post(auth::revoke))
        .route("/me", get(auth::me));

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/v3/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Resource not found")
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::refresh,
        auth::logout,
        auth::revoke,
        auth::me,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RefreshRequest,
            auth::RefreshResponse,
            auth::LogoutResponse,
            auth::RevokeResponse,
            auth::MeResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            Role
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Auth", description = "Login, token refresh and logout"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
