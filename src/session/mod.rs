// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Refresh Sessions
//!
//! Server-side refresh sessions kept in a TTL store, at most one live
//! session per user.
//!
//! ## Flow
//!
//! 1. Login calls [`SessionManager::create`], which replaces any previous
//!    session of the user
//! 2. The client trades the opaque refresh token for a new access token via
//!    [`SessionManager::refresh_access_token`]
//! 3. Logout calls [`SessionManager::revoke`]
//!
//! The store is in-process by default, or Redis when `REDIS_URL` is set.

pub mod manager;
pub mod model;
pub mod redis;
pub mod store;

pub use manager::{SessionError, SessionManager};
pub use model::RefreshSession;
pub use redis::RedisSessionStore;
pub use store::{InMemorySessionStore, SessionStore, StoreError};
