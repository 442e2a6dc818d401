// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh-session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A server-side refresh session.
///
/// `token` is opaque to clients: it carries no claims and is only meaningful
/// as a key into the session store. `expiry_date` is the authoritative
/// expiry; the store's own TTL is at least as long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSession {
    pub id: String,
    pub token: String,
    pub user_id: i64,
    pub expiry_date: DateTime<Utc>,
}

impl RefreshSession {
    /// New session with a random id and opaque token.
    pub fn new(user_id: i64, expiry_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token: Uuid::new_v4().to_string(),
            user_id,
            expiry_date,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }
}
