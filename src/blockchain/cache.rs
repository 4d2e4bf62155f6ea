// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for on-chain transaction lookups.
//!
//! Only transactions that are already in a block are cached: once included,
//! the node's answer for a hash no longer changes.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::types::{RawTransaction, TransactionInfo};

/// A node's answer for one hash.
#[derive(Debug, Clone)]
pub struct CachedLookup {
    pub transaction: RawTransaction,
    pub info: Option<TransactionInfo>,
}

struct CacheEntry {
    lookup: CachedLookup,
    inserted_at: Instant,
}

/// In-process LRU cache keyed by lowercase transaction hash.
pub struct ChainCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ChainCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, tx_hash: &str) -> Option<CachedLookup> {
        let key = tx_hash.to_lowercase();
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.lookup.clone());
            }
            cache.pop(&key);
        }
        None
    }

    /// Store a lookup if the transaction is already in a block.
    pub fn put_if_final(&self, tx_hash: &str, lookup: &CachedLookup) -> bool {
        let in_block = lookup
            .info
            .as_ref()
            .and_then(|i| i.block_number)
            .is_some();
        if !in_block {
            return false;
        }

        let key = tx_hash.to_lowercase();
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    lookup: lookup.clone(),
                    inserted_at: Instant::now(),
                },
            );
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}
