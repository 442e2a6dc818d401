// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access-token claims and the authenticated request context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::directory::Principal;
use super::roles::Role;

/// Claims embedded in an access token.
///
/// Only the subject and the validity window are carried; role and account
/// state are resolved from the principal directory on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (username)
    pub sub: String,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Expiration, Unix seconds rounded up, for standard JWT consumers
    pub exp: i64,
    /// Expiration, Unix milliseconds; authoritative for verification
    pub exp_ms: i64,
}

/// Authenticated principal bound to a single request.
///
/// Inserted into the request extensions by the authentication gate and read
/// back by the extractors in `extractor.rs`. It never outlives the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Directory identifier of the principal
    pub user_id: i64,

    /// Username (the token subject)
    pub username: String,

    /// Principal's role
    pub role: Role,
}

impl AuthenticatedUser {
    /// Build the request context from a resolved principal.
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            user_id: principal.id,
            username: principal.username.clone(),
            role: principal.role,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }
}
