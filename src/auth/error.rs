// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::token::TokenError;
use crate::error::ApiError;

/// Why a request could not be authenticated or authorized.
///
/// On a public route every variant except `AccessDenied` is swallowed by the
/// gate; on a protected route each becomes a 401 (or 403).
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on a route that needs one
    #[error("Authentication is required to access this resource")]
    MissingToken,
    #[error("Token is malformed")]
    MalformedToken,
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// Clients answer this one by refreshing
    #[error("Token expired")]
    TokenExpired,
    #[error("Principal not found")]
    PrincipalNotFound,
    #[error("Principal is inactive")]
    PrincipalInactive,
    /// Authenticated but lacking the role the route needs
    #[error("You do not have permission to perform this action")]
    AccessDenied,
    /// Anything unexpected while authenticating
    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::SignatureInvalid => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "token_missing",
            AuthError::TokenExpired => "token_expired",
            AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::PrincipalNotFound
            | AuthError::PrincipalInactive => "token_invalid",
            AuthError::AccessDenied => "access_denied",
            AuthError::Internal(_) => "authentication_failed",
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Internal failures still answer 401: authentication fails closed.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AccessDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message sent to the client.
    ///
    /// Principal lookup failures read exactly like an invalid token, and
    /// internal details never leave the process.
    fn client_message(&self) -> String {
        match self {
            AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::PrincipalNotFound
            | AuthError::PrincipalInactive => "Invalid token".to_string(),
            AuthError::Internal(_) => "Authentication failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::new(self.status_code(), self.client_message())
            .with_code(self.error_code())
            .into_response()
    }
}
