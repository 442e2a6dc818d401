// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication gate middleware for Axum.
//!
//! Every request passes through [`auth_gate_middleware`] after rate
//! limiting. The gate:
//!
//! 1. Looks up the route's [`Access`] level in the [`RouteTable`]
//! 2. Reads `Authorization: Bearer <token>` if present
//! 3. Verifies the token and resolves the principal from the directory
//! 4. Applies the decision table below, then the route's role requirement
//!
//! | Token state                     | Public route   | Protected route |
//! |---------------------------------|----------------|-----------------|
//! | absent                          | anonymous      | 401             |
//! | valid, principal active         | authenticated  | authenticated   |
//! | expired                         | anonymous      | 401 `token_expired` |
//! | malformed / bad signature       | anonymous      | 401 `token_invalid` |
//! | principal missing or inactive   | anonymous      | 401 `token_invalid` |
//!
//! An authenticated principal lacking the role a route requires gets 403.
//!
//! The resolved [`AuthenticatedUser`] is inserted into the request
//! extensions, where the extractors in `extractor.rs` pick it up.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::directory::PrincipalDirectory;
use super::routes::{Access, Classification, RouteTable};
use super::token::TokenCodec;
use super::{AuthError, AuthenticatedUser};

/// Outcome of running the gate over one request.
#[derive(Debug)]
pub enum GateOutcome {
    /// Continue without an authenticated context
    Anonymous,
    /// Continue with the principal bound to the request
    Authenticated(AuthenticatedUser),
    /// Short-circuit before any handler runs
    Rejected(AuthError),
}

/// Shared state of the gate middleware.
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    directory: Arc<dyn PrincipalDirectory>,
    routes: Arc<RouteTable>,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, directory: Arc<dyn PrincipalDirectory>, routes: Arc<RouteTable>) -> Self {
        Self {
            codec,
            directory,
            routes,
        }
    }

    /// Decide what happens to a request with the given method, path and headers.
    pub async fn evaluate(&self, method: &Method, path: &str, headers: &HeaderMap) -> GateOutcome {
        let access = self.routes.access(method, path);

        let user = match bearer_token(headers) {
            None => None,
            Some(token) => match self.authenticate(token).await {
                Ok(user) => Some(user),
                Err(err) => match access.classification() {
                    Classification::Public => {
                        debug!(%method, path, error = %err, "Ignoring bad token on public route");
                        None
                    }
                    Classification::Protected => {
                        warn!(%method, path, error = %err, "Rejected token on protected route");
                        return GateOutcome::Rejected(err);
                    }
                },
            },
        };

        authorize(access, user)
    }

    /// Verify the token and resolve its subject to an active principal.
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let verified = self.codec.verify(token)?;

        let principal = self
            .directory
            .find_by_username(&verified.subject)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !principal.active {
            return Err(AuthError::PrincipalInactive);
        }

        Ok(AuthenticatedUser::from_principal(&principal))
    }
}

fn authorize(access: Access, user: Option<AuthenticatedUser>) -> GateOutcome {
    match (access, user) {
        (Access::Public, None) => GateOutcome::Anonymous,
        (_, None) => GateOutcome::Rejected(AuthError::MissingToken),
        (Access::Role(required), Some(user)) if !user.has_role(required) => {
            warn!(user_id = user.user_id, role = %user.role, "Access denied");
            GateOutcome::Rejected(AuthError::AccessDenied)
        }
        (_, Some(user)) => GateOutcome::Authenticated(user),
    }
}

/// Token from `Authorization: Bearer <token>`; any other form counts as absent.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Use with `axum::middleware::from_fn_with_state(gate, auth_gate_middleware)`.
pub async fn auth_gate_middleware(State(gate): State<AuthGate>, mut request: Request, next: Next) -> Response {
    let outcome = gate
        .evaluate(request.method(), request.uri().path(), request.headers())
        .await;

    match outcome {
        GateOutcome::Anonymous => next.run(request).await,
        GateOutcome::Authenticated(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        GateOutcome::Rejected(err) => err.into_response(),
    }
}
