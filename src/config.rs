// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the [`GatewayConfig`] loaded
//! from them once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 signing secret, at least 32 bytes | Required |
//! | `JWT_EXPIRATION_MS` | Access-token lifetime | `86400000` (24h) |
//! | `JWT_REFRESH_EXPIRATION_MS` | Refresh-session lifetime | `2592000000` (30d) |
//! | `SESSION_STORE_TTL_SECS` | Store-level session TTL, never below the refresh lifetime | `2592000` |
//! | `RATE_LIMIT_SEARCH_PER_MINUTE` | Search endpoint capacity per client | `30` |
//! | `RATE_LIMIT_GENERAL_PER_MINUTE` | General endpoint capacity per client | `100` |
//! | `REDIS_URL` | Redis session store; in-process store when unset | Optional |
//! | `SEED_ADMIN_USERNAME` | Admin principal seeded at startup | Optional |
//! | `SEED_ADMIN_PASSWORD` | Password of the seeded admin | Optional |
//! | `SEED_ADMIN_ROLE` | Authority of the seeded principal (`ROLE_ADMIN`, `ADMIN`, `USER`, ...) | `ROLE_ADMIN` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::auth::Role;
use crate::rate_limit::RateLimitConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the token signing secret.
///
/// Shared by every instance behind the same load balancer; tokens signed
/// by one instance must verify on the others.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION_MS";
pub const JWT_REFRESH_EXPIRATION_ENV: &str = "JWT_REFRESH_EXPIRATION_MS";
pub const SESSION_STORE_TTL_ENV: &str = "SESSION_STORE_TTL_SECS";
pub const RATE_LIMIT_SEARCH_ENV: &str = "RATE_LIMIT_SEARCH_PER_MINUTE";
pub const RATE_LIMIT_GENERAL_ENV: &str = "RATE_LIMIT_GENERAL_PER_MINUTE";
pub const REDIS_URL_ENV: &str = "REDIS_URL";
pub const SEED_ADMIN_USERNAME_ENV: &str = "SEED_ADMIN_USERNAME";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const SEED_ADMIN_ROLE_ENV: &str = "SEED_ADMIN_ROLE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_JWT_EXPIRATION_MS: u64 = 86_400_000;
pub const DEFAULT_JWT_REFRESH_EXPIRATION_MS: u64 = 2_592_000_000;
/// Matches the 30 day TTL of the `refresh_tokens` keyspace.
pub const DEFAULT_SESSION_STORE_TTL_SECS: u64 = 2_592_000;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// HS256 keys shorter than the hash output weaken the MAC.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("JWT_SECRET must be at least 32 bytes")]
    SecretTooShort,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// Gateway configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub session_store_ttl: Duration,
    pub rate_limit: RateLimitConfig,
    pub redis_url: Option<String>,
    pub admin_seed: Option<AdminSeed>,
    pub log_format: LogFormat,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&get, PORT_ENV, DEFAULT_PORT)?;
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host,
            })?;

        let jwt_secret = get(JWT_SECRET_ENV)
            .ok_or(ConfigError::Missing(JWT_SECRET_ENV))?
            .into_bytes();
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort);
        }

        let access_ttl = Duration::from_millis(positive(&get, JWT_EXPIRATION_ENV, DEFAULT_JWT_EXPIRATION_MS)?);
        let refresh_ttl = Duration::from_millis(positive(
            &get,
            JWT_REFRESH_EXPIRATION_ENV,
            DEFAULT_JWT_REFRESH_EXPIRATION_MS,
        )?);
        let session_store_ttl =
            Duration::from_secs(positive(&get, SESSION_STORE_TTL_ENV, DEFAULT_SESSION_STORE_TTL_SECS)?)
                .max(refresh_ttl);

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            search_capacity: positive(&get, RATE_LIMIT_SEARCH_ENV, defaults.search_capacity)?,
            general_capacity: positive(&get, RATE_LIMIT_GENERAL_ENV, defaults.general_capacity)?,
            ..defaults
        };

        let admin_seed = match (get(SEED_ADMIN_USERNAME_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(username), Some(password)) => {
                let role = match get(SEED_ADMIN_ROLE_ENV) {
                    None => Role::Admin,
                    Some(raw) => Role::from_authority(&raw).ok_or(ConfigError::Invalid {
                        name: SEED_ADMIN_ROLE_ENV,
                        value: raw,
                    })?,
                };
                Some(AdminSeed {
                    username,
                    password,
                    role,
                })
            }
            (Some(_), None) => return Err(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV)),
            _ => None,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            access_ttl,
            refresh_ttl,
            session_store_ttl,
            rate_limit,
            redis_url: get(REDIS_URL_ENV),
            admin_seed,
            log_format,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn positive<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, name, default)?;
    if value == T::default() {
        return Err(ConfigError::Zero(name));
    }
    Ok(value)
}
