use ahash::RandomState;
use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::Value;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tracing::{debug, trace};

/// Identifies an immutable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A block addressed by its hash.
    Block(String),
    /// A mined transaction addressed by its id.
    Transaction(String),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(hash) => write!(f, "block:{hash}"),
            Self::Transaction(txid) => write!(f, "tx:{txid}"),
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Write-once store for immutable entities.
///
/// Uses `DashMap` so concurrent queries can read and populate without a global lock. A key,
/// once present, keeps its first value: two lookups that both miss and both populate the
/// same key race benignly.
pub struct ImmutableCache {
    entries: DashMap<CacheKey, Arc<Value>, RandomState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ImmutableCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmutableCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a cached payload. Never touches the upstream.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Value>> {
        let value = self.entries.get(key).map(|entry| Arc::clone(entry.value()));

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "cache miss");
        }

        value
    }

    /// Stores a payload unless the key is already present.
    ///
    /// Returns `true` if this call inserted the value.
    pub fn put(&self, key: CacheKey, value: Value) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(existing) => {
                trace!(key = %existing.key(), "cache entry already present, keeping first value");
                false
            }
            Entry::Vacant(slot) => {
                trace!(key = %slot.key(), "caching immutable entity");
                slot.insert(Arc::new(value));
                true
            }
        }
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        debug!(dropped, "immutable cache cleared");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
