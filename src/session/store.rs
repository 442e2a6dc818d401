// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TTL key-value store holding refresh sessions.
//!
//! Implementations provide their own per-key atomicity; the session manager
//! adds no locking on top.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::RefreshSession;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store backend error: {0}")]
    Backend(String),
    #[error("session record could not be decoded: {0}")]
    Corrupt(String),
}

/// Durable dictionary of refresh sessions with store-level expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite a session; the store evicts it after `ttl`.
    async fn save(&self, session: &RefreshSession, ttl: Duration) -> Result<(), StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshSession>, StoreError>;

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<RefreshSession>, StoreError>;

    /// Remove a session; deleting an absent session is not an error.
    async fn delete(&self, session: &RefreshSession) -> Result<(), StoreError>;

    async fn delete_all(&self, sessions: &[RefreshSession]) -> Result<(), StoreError> {
        for session in sessions {
            self.delete(session).await?;
        }
        Ok(())
    }

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct StoredSession {
    session: RefreshSession,
    evict_at: Instant,
}

impl StoredSession {
    fn is_live(&self, now: Instant) -> bool {
        now < self.evict_at
    }
}

/// In-process TTL store.
///
/// Evicted entries are invisible to reads immediately and physically dropped
/// on the next write.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, StoredSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session: &RefreshSession, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            session.id.clone(),
            StoredSession {
                session: session.clone(),
                evict_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshSession>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .values()
            .find(|entry| entry.is_live(now) && entry.session.token == token)
            .map(|entry| entry.session.clone()))
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<RefreshSession>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now) && entry.session.user_id == user_id)
            .map(|entry| entry.session.clone())
            .collect())
    }

    async fn delete(&self, session: &RefreshSession) -> Result<(), StoreError> {
        self.entries.write().await.remove(&session.id);
        Ok(())
    }
}
