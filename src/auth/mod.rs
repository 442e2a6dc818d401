// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the listing API.
//!
//! ## Auth Flow
//!
//! 1. Client logs in at `/api/v1/auth/login` and receives an HS256 access
//!    token plus an opaque refresh token
//! 2. Client sends `Authorization: Bearer <access token>`
//! 3. The gate middleware:
//!    - Classifies the route from the single [`RouteTable`]
//!    - Verifies signature and expiry
//!    - Resolves `sub` (username) to an active principal
//!    - Binds [`AuthenticatedUser`] to the request or rejects
//!
//! ## Security
//!
//! - Token failures on public routes degrade to anonymous access
//! - Token failures on protected routes answer 401; an expired token is
//!   reported as `token_expired` so clients know to refresh
//! - Unexpected errors while authenticating fail closed (401)
//! - No clock skew leeway

pub mod claims;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod roles;
pub mod routes;
pub mod token;

pub use claims::AuthenticatedUser;
pub use directory::{InMemoryDirectory, Principal, PrincipalDirectory};
pub use error::AuthError;
pub use extractor::Auth;
pub use middleware::{auth_gate_middleware, AuthGate, GateOutcome};
pub use roles::Role;
pub use routes::{Access, Classification, RouteTable};
pub use token::{TokenCodec, TokenError};
