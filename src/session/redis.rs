// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Redis-backed session store.
//!
//! ## Key Layout
//!
//! ```text
//! refresh_tokens:{id}                 JSON record, SET EX ttl
//! refresh_tokens:token:{token}        id, SET EX ttl
//! refresh_tokens:userId:{user_id}     set of ids, EXPIRE ttl
//! ```
//!
//! Index entries can outlive the record they point at (Redis evicts each key
//! independently); readers treat a dangling index entry as absent and clean
//! it up.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::{debug, info};

use super::model::RefreshSession;
use super::store::{SessionStore, StoreError};

const KEY_PREFIX: &str = "refresh_tokens";

fn record_key(id: &str) -> String {
    format!("{KEY_PREFIX}:{id}")
}

fn token_key(token: &str) -> String {
    format!("{KEY_PREFIX}:token:{token}")
}

fn user_key(user_id: i64) -> String {
    format!("{KEY_PREFIX}:userId:{user_id}")
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub struct RedisSessionStore {
    connection_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(backend)?;
        let connection_manager = ConnectionManager::new(client).await.map_err(backend)?;
        info!("Connected to Redis session store");

        Ok(Self { connection_manager })
    }

    async fn load(&self, id: &str) -> Result<Option<RefreshSession>, StoreError> {
        let mut conn = self.connection_manager.clone();
        let raw: Option<String> = conn.get(record_key(id)).await.map_err(backend)?;

        raw.map(|json| serde_json::from_str(&json).map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &RefreshSession, ttl: Duration) -> Result<(), StoreError> {
        let json = serde_json::to_string(session).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.connection_manager.clone();

        let _: () = redis::pipe()
            .atomic()
            .set_ex(record_key(&session.id), json, ttl_secs)
            .ignore()
            .set_ex(token_key(&session.token), &session.id, ttl_secs)
            .ignore()
            .sadd(user_key(session.user_id), &session.id)
            .ignore()
            .expire(user_key(session.user_id), i64::try_from(ttl_secs).unwrap_or(i64::MAX))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshSession>, StoreError> {
        let mut conn = self.connection_manager.clone();
        let id: Option<String> = conn.get(token_key(token)).await.map_err(backend)?;
        let Some(id) = id else {
            return Ok(None);
        };

        match self.load(&id).await? {
            Some(session) => Ok(Some(session)),
            None => {
                debug!(session_id = %id, "Dropping dangling token index");
                let _: () = conn.del(token_key(token)).await.map_err(backend)?;
                Ok(None)
            }
        }
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<RefreshSession>, StoreError> {
        let mut conn = self.connection_manager.clone();
        let ids: Vec<String> = conn.smembers(user_key(user_id)).await.map_err(backend)?;

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&id).await? {
                Some(session) => sessions.push(session),
                None => {
                    let _: () = conn.srem(user_key(user_id), &id).await.map_err(backend)?;
                }
            }
        }
        Ok(sessions)
    }

    async fn delete(&self, session: &RefreshSession) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();

        let _: () = redis::pipe()
            .atomic()
            .del(record_key(&session.id))
            .ignore()
            .del(token_key(&session.token))
            .ignore()
            .srem(user_key(session.user_id), &session.id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        let response: String = redis::cmd("PING").query_async(&mut conn).await.map_err(backend)?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("unexpected PING reply: {response}")))
        }
    }
}
