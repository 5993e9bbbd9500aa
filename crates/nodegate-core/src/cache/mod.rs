//! Caching for ledger entities that never change once they exist.
//!
//! There is no TTL and no eviction: blocks addressed by hash and mined transactions addressed
//! by id are final. Which requests are cacheable is decided by the gateway, not here.
//!
//! The cache is scoped to one session's view of the ledger and is cleared on disconnect.

pub mod immutable_cache;

pub use immutable_cache::{CacheKey, CacheStats, ImmutableCache};
