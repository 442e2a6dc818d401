// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal lookup collaborator.
//!
//! The gateway only reads principals; creating and editing them belongs to
//! the identity service behind this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

use super::roles::Role;

/// A principal as owned by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("principal directory unavailable: {0}")]
    Unavailable(String),
}

/// Read access to principals, plus the credential check used at login.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, DirectoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, DirectoryError>;

    /// Check a plaintext password against the principal's stored hash.
    fn verify_password(&self, principal: &Principal, password: &str) -> bool;
}

/// Development and test directory holding principals in memory.
///
/// Passwords are stored as hex SHA-256 digests.
#[derive(Default)]
pub struct InMemoryDirectory {
    principals: RwLock<HashMap<i64, Principal>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a principal with the next free id and return it.
    pub async fn insert(&self, username: &str, password: &str, role: Role, active: bool) -> Principal {
        let mut principals = self.principals.write().await;
        let id = principals.keys().max().copied().unwrap_or(0) + 1;
        let principal = Principal {
            id,
            username: username.to_string(),
            password_hash: hash_password(password),
            role,
            active,
        };
        principals.insert(id, principal.clone());
        principal
    }

    /// Flip the active flag; returns false if the id is unknown.
    pub async fn set_active(&self, id: i64, active: bool) -> bool {
        match self.principals.write().await.get_mut(&id) {
            Some(principal) => {
                principal.active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, DirectoryError> {
        Ok(self
            .principals
            .read()
            .await
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, DirectoryError> {
        Ok(self.principals.read().await.get(&id).cloned())
    }

    fn verify_password(&self, principal: &Principal, password: &str) -> bool {
        principal.password_hash == hash_password(password)
    }
}

fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}
