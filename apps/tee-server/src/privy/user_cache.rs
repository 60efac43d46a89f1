// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded TTL cache for resolved user records.
//!
//! Keyed by principal ID; holds whole user records including a freshly
//! minted wallet ID so a signing burst for one principal costs a single
//! upstream lookup. Entries expire after 30 minutes, and capacity
//! pressure evicts least-recently-used entries first.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::data::PrivyUser;

/// Maximum number of principals held at once.
pub const USER_CACHE_CAPACITY: usize = 1000;

/// Time-to-live for each cache entry.
pub const USER_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

struct CacheEntry {
    user: PrivyUser,
    inserted_at: Instant,
}

/// In-process LRU cache of user records.
pub struct UserCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl UserCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(USER_CACHE_CAPACITY, USER_CACHE_TTL)
    }

    /// Fetch the cached record for a principal, if present and fresh.
    pub fn get(&self, privy_id: &str) -> Option<PrivyUser> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(privy_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.user.clone());
            }
            cache.pop(privy_id);
        }
        None
    }

    /// Store a record for a principal.
    pub fn put(&self, privy_id: &str, user: PrivyUser) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                privy_id.to_owned(),
                CacheEntry {
                    user,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Drop the entry for a principal.
    pub fn invalidate(&self, privy_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(privy_id);
        }
    }
}
