// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login, token refresh and logout.
//!
//! Everything under `/api/v1/auth` is public at the gate; `logout` and `me`
//! still need the principal the gate bound from a valid access token.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::{Auth, Role},
    error::{ApiError, ApiJson, ApiResponse},
    state::AppState,
};

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const ACCOUNT_DISABLED: &str = "Account is locked or disabled";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Access token for the `Authorization: Bearer` header
    pub token: String,
    /// Opaque refresh token
    pub refresh_token: String,
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    /// Same value as the request; refresh tokens are not rotated
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    /// Number of refresh sessions deleted
    pub revoked: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevokeResponse {
    /// Whether a session held the token
    pub revoked: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing credentials or unreadable body"),
        (status = 401, description = "Invalid username or password"),
        (status = 403, description = "Account is locked or disabled")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let principal = state
        .directory
        .find_by_username(&request.username)
        .await
        .map_err(|e| {
            warn!(error = %e, "Principal lookup failed during login");
            ApiError::internal("Authentication service unavailable")
        })?;

    // Password first, so account status is only revealed to its owner.
    let principal = match principal {
        Some(p) if state.directory.verify_password(&p, &request.password) => p,
        _ => {
            warn!(username = %request.username, "Login failed: bad credentials");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };
    if !principal.active {
        warn!(user_id = principal.id, "Login refused: account disabled");
        return Err(ApiError::forbidden(ACCOUNT_DISABLED));
    }

    let token = state.codec.issue(&principal.username).map_err(|e| {
        warn!(error = %e, "Failed to sign access token");
        ApiError::internal("Failed to issue token")
    })?;
    let session = state.sessions.create(principal.id).await?;

    info!(user_id = principal.id, "User logged in");
    Ok(ApiResponse::ok(
        LoginResponse {
            token,
            refresh_token: session.token,
            id: principal.id,
            username: principal.username,
            role: principal.role,
        },
        "Login successful",
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 403, description = "Refresh token unknown or expired")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<ApiResponse<RefreshResponse>, ApiError> {
    let access_token = state
        .sessions
        .refresh_access_token(&request.refresh_token)
        .await
        .inspect_err(|e| warn!(error = %e, "Token refresh failed"))?;

    Ok(ApiResponse::ok(
        RefreshResponse {
            access_token,
            refresh_token: request.refresh_token,
        },
        "Token refreshed",
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Sessions revoked", body = LogoutResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<ApiResponse<LogoutResponse>, ApiError> {
    let revoked = state.sessions.revoke(user.user_id).await?;
    Ok(ApiResponse::ok(LogoutResponse { revoked }, "Logged out"))
}

/// Delete the single session holding a refresh token. Possession of the
/// token is the credential; no access token is needed.
#[utoipa::path(
    post,
    path = "/api/v1/auth/revoke",
    request_body = RefreshRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Session revoked or already gone", body = RevokeResponse)
    )
)]
pub async fn revoke(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<ApiResponse<RevokeResponse>, ApiError> {
    let revoked = state.sessions.revoke_token(&request.refresh_token).await?;
    Ok(ApiResponse::ok(RevokeResponse { revoked }, "Refresh token revoked"))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(Auth(user): Auth) -> ApiResponse<MeResponse> {
    ApiResponse::ok(
        MeResponse {
            id: user.user_id,
            username: user.username,
            role: user.role,
        },
        "Current user",
    )
}
