// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listing Gateway - request-edge layer of the listing-site backend
//!
//! Runs in front of every business handler: verifies bearer tokens, keeps
//! server-side refresh sessions and rate-limits clients per endpoint class.
//!
//! ## Modules
//!
//! - `api` - Auth and health handlers, OpenAPI docs (Axum)
//! - `auth` - Token codec, route table and the authentication gate
//! - `session` - Refresh sessions over an in-memory or Redis TTL store
//! - `rate_limit` - Fixed-window limiter keyed by client and endpoint class
//! - `gateway` - Middleware ordering around the router

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod rate_limit;
pub mod session;
pub mod state;
