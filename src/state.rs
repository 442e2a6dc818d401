// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthGate, PrincipalDirectory, RouteTable, TokenCodec};
use crate::config::GatewayConfig;
use crate::rate_limit::RateLimiter;
use crate::session::{SessionManager, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub routes: Arc<RouteTable>,
    pub directory: Arc<dyn PrincipalDirectory>,
    pub sessions: Arc<SessionManager>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the gateway components from configuration and collaborators.
    pub fn new(
        config: &GatewayConfig,
        directory: Arc<dyn PrincipalDirectory>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.jwt_secret, config.access_ttl));
        let sessions = Arc::new(SessionManager::new(
            store,
            directory.clone(),
            codec.clone(),
            config.refresh_ttl,
            config.session_store_ttl,
        ));

        Self {
            codec,
            routes: Arc::new(RouteTable::listing_site()),
            directory,
            sessions,
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
        }
    }

    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.codec.clone(), self.directory.clone(), self.routes.clone())
    }
}
