// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh-session lifecycle with a single-session-per-user policy.
//!
//! ## Policy
//!
//! - `create` deletes every existing session of the user before inserting
//!   the new one. Two logins racing for the same user can briefly leave two
//!   live sessions; the store is not locked around the delete + insert.
//! - Refresh tokens are not rotated: refreshing issues a new access token and
//!   leaves the refresh token valid until its own expiry.
//! - Expiry is lazy. A session past its `expiry_date` is deleted the next
//!   time it is presented, regardless of the store's own TTL.

use std::sync::Arc;
use std::time::Duration;

use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use super::model::RefreshSession;
use super::store::{SessionStore, StoreError};
use crate::auth::directory::{DirectoryError, PrincipalDirectory};
use crate::auth::token::{TokenCodec, TokenError};
use crate::error::ApiError;

/// Session failures surfaced to the refresh endpoint.
///
/// The token-bearing variants carry the offending refresh token for
/// diagnostics; nothing about other sessions or the signing secret.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed for [{token}]: Refresh token is not in database!")]
    NotFound { token: String },
    #[error("Failed for [{token}]: Refresh token was expired. Please make a new signin request")]
    Expired { token: String },
    #[error("Failed for [{token}]: User not found associated with token")]
    PrincipalNotFound { token: String },
    #[error("Failed for [{token}]: User account is disabled")]
    PrincipalInactive { token: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl SessionError {
    /// The refresh token this failure concerns, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            SessionError::NotFound { token }
            | SessionError::Expired { token }
            | SessionError::PrincipalNotFound { token }
            | SessionError::PrincipalInactive { token } => Some(token),
            _ => None,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::NotFound { .. } => ApiError::forbidden(message).with_code("session_not_found"),
            SessionError::Expired { .. } => ApiError::forbidden(message).with_code("session_expired"),
            SessionError::PrincipalNotFound { .. } | SessionError::PrincipalInactive { .. } => {
                ApiError::forbidden(message).with_code("session_principal_invalid")
            }
            SessionError::Store(_) | SessionError::Directory(_) | SessionError::Token(_) => {
                warn!(error = %message, "Session operation failed");
                ApiError::internal("Session service unavailable")
            }
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn PrincipalDirectory>,
    codec: Arc<TokenCodec>,
    refresh_ttl: Duration,
    store_ttl: Duration,
}

impl SessionManager {
    /// `store_ttl` is raised to `refresh_ttl` if shorter, so the store never
    /// evicts a session that is still logically valid.
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn PrincipalDirectory>,
        codec: Arc<TokenCodec>,
        refresh_ttl: Duration,
        store_ttl: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            codec,
            refresh_ttl,
            store_ttl: store_ttl.max(refresh_ttl),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Start a new session for `user_id`, dropping any existing ones.
    pub async fn create(&self, user_id: i64) -> Result<RefreshSession, SessionError> {
        info!(user_id, "Creating refresh session");

        let existing = self.store.find_by_user(user_id).await?;
        if !existing.is_empty() {
            self.store.delete_all(&existing).await?;
        }

        let session = RefreshSession::new(user_id, self.expiry_from(Utc::now()));
        self.store.save(&session, self.store_ttl).await?;
        Ok(session)
    }

    pub async fn find(&self, token: &str) -> Result<Option<RefreshSession>, SessionError> {
        Ok(self.store.find_by_token(token).await?)
    }

    /// Return the session if its logical expiry is still ahead; otherwise
    /// delete it and fail.
    pub async fn verify_not_expired(&self, session: RefreshSession) -> Result<RefreshSession, SessionError> {
        if session.is_expired_at(Utc::now()) {
            warn!(user_id = session.user_id, "Refresh token expired");
            self.store.delete(&session).await?;
            return Err(SessionError::Expired { token: session.token });
        }
        Ok(session)
    }

    /// Issue a new access token for the owner of the refresh token.
    ///
    /// The refresh token itself stays as it is.
    pub async fn refresh_access_token(&self, token: &str) -> Result<String, SessionError> {
        let session = self
            .find(token)
            .await?
            .ok_or_else(|| SessionError::NotFound {
                token: token.to_string(),
            })?;
        let session = self.verify_not_expired(session).await?;

        let principal = self
            .directory
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(|| SessionError::PrincipalNotFound {
                token: token.to_string(),
            })?;
        if !principal.active {
            return Err(SessionError::PrincipalInactive {
                token: token.to_string(),
            });
        }

        Ok(self.codec.issue(&principal.username)?)
    }

    /// Delete every session of `user_id`; returns how many were removed.
    pub async fn revoke(&self, user_id: i64) -> Result<usize, SessionError> {
        let sessions = self.store.find_by_user(user_id).await?;
        if sessions.is_empty() {
            return Ok(0);
        }
        self.store.delete_all(&sessions).await?;
        info!(user_id, revoked = sessions.len(), "Revoked refresh sessions");
        Ok(sessions.len())
    }

    /// Delete the session holding `token`, if any.
    pub async fn revoke_token(&self, token: &str) -> Result<bool, SessionError> {
        match self.store.find_by_token(token).await? {
            Some(session) => {
                self.store.delete(&session).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.refresh_ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
