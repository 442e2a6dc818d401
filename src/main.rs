// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc};

use listing_gateway::{
    api::router,
    auth::InMemoryDirectory,
    config::{GatewayConfig, LogFormat, DEFAULT_LOG_FILTER},
    session::{InMemorySessionStore, RedisSessionStore, SessionStore},
    state::AppState,
};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() {
    let config = GatewayConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    // Principal directory
    let directory = Arc::new(InMemoryDirectory::new());
    if let Some(seed) = &config.admin_seed {
        let admin = directory.insert(&seed.username, &seed.password, seed.role, true).await;
        info!(user_id = admin.id, username = %admin.username, role = %admin.role, "Seeded principal");
    }

    // Session store (Redis when configured)
    let store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisSessionStore::connect(url)
                .await
                .expect("Failed to connect to Redis session store"),
        ),
        None => {
            info!("REDIS_URL not set, using in-process session store");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let state = AppState::new(&config, directory, store);
    let app = router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    info!("Listing gateway listening on http://{} (docs at /swagger-ui)", config.bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    info!("Listing gateway shut down");
}

/// Wait for ctrl-c signal for graceful shutdown.
async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    info!("Received shutdown signal");
}
