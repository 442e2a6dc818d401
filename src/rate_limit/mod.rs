// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Rate Limiting
//!
//! Fixed-window request counters per client identity and endpoint class.
//!
//! ## Algorithm
//!
//! Each `(identity, class)` pair owns a bucket `{window_start, remaining}`.
//! A request takes the bucket's shard lock, replaces the bucket if its
//! window has elapsed, then decrements `remaining`. A negative result is a
//! rejection. `remaining` bottoms out at `-1`, so a client hammering a
//! closed window does not push the counter further down.
//!
//! Capacity resets wholesale at the window boundary; there is no continuous
//! refill.
//!
//! ## Cleanup
//!
//! Every `sweep_interval` (checked on request handling, no timer task) dead
//! buckets whose window ended more than one window ago are removed.

pub mod identity;
pub mod middleware;

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

pub use identity::resolve_client_identity;
pub use middleware::rate_limit_middleware;

/// Path prefix whose collection reads count as catalog search.
const SEARCH_PATH: &str = "/api/v1/properties";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Search,
    General,
}

impl EndpointClass {
    /// Search is any catalog path that does not address a single item by id.
    pub fn of_path(path: &str) -> Self {
        if path.contains(SEARCH_PATH) && !addresses_item_id(path) {
            EndpointClass::Search
        } else {
            EndpointClass::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Search => "search",
            EndpointClass::General => "general",
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if any path segment starts with a digit.
fn addresses_item_id(path: &str) -> bool {
    path.as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'/' && pair[1].is_ascii_digit())
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub search_capacity: u32,
    pub general_capacity: u32,
    pub window: Duration,
    pub sweep_interval: Duration,
}

impl RateLimitConfig {
    pub fn capacity(&self, class: EndpointClass) -> u32 {
        match class {
            EndpointClass::Search => self.search_capacity,
            EndpointClass::General => self.general_capacity,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            search_capacity: 30,
            general_capacity: 100,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Rejected,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    identity: String,
    class: EndpointClass,
}

#[derive(Debug)]
struct Bucket {
    window_start: Instant,
    remaining: i64,
}

impl Bucket {
    fn fresh(now: Instant, capacity: u32) -> Self {
        Self {
            window_start: now,
            remaining: i64::from(capacity),
        }
    }

    fn window_elapsed(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }

    fn take(&mut self) -> Decision {
        if self.remaining < 0 {
            return Decision::Rejected;
        }
        self.remaining -= 1;
        match u32::try_from(self.remaining) {
            Ok(remaining) => Decision::Allowed { remaining },
            Err(_) => Decision::Rejected,
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<BucketKey, Bucket>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn check(&self, identity: &str, class: EndpointClass) -> Decision {
        self.check_at(identity, class, Instant::now())
    }

    /// Count one request for `(identity, class)` as of `now`.
    pub fn check_at(&self, identity: &str, class: EndpointClass, now: Instant) -> Decision {
        let capacity = self.config.capacity(class);
        let key = BucketKey {
            identity: identity.to_string(),
            class,
        };

        // Replace-if-elapsed and decrement happen under the same shard lock.
        let decision = {
            let mut bucket = self
                .buckets
                .entry(key)
                .or_insert_with(|| Bucket::fresh(now, capacity));
            if bucket.window_elapsed(now, self.config.window) {
                *bucket = Bucket::fresh(now, capacity);
            }
            bucket.take()
        };

        self.sweep_if_due(now);
        decision
    }

    /// Remove buckets whose window ended more than one window before `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let grace = self.config.window * 2;
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) <= grace);
        let removed = before.saturating_sub(self.buckets.len());

        if removed > 0 {
            debug!(removed, remaining = self.buckets.len(), "Swept rate limit buckets");
        }
        removed
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn sweep_if_due(&self, now: Instant) {
        // Another request already sweeping (or a poisoned lock) just skips.
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last) < self.config.sweep_interval {
            return;
        }
        *last = now;
        drop(last);
        self.sweep_at(now);
    }
}
