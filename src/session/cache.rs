//! Short-lived response cache.
//!
//! Namespaced key→value store with per-namespace time-to-live. Expiry is lazy:
//! an expired entry reads as absent and is purged on that access, there is no
//! background sweep and no capacity eviction — session lifetime and lookup
//! volume are small and already bounded by the budget governor.
//!
//! Caller contract (not enforced here): cache only terminal, immutable facts —
//! finished job states, already-fetched query metadata. Caching a pending
//! state would starve later polls of true progress.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Single cached value with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    inserted: Instant,
}

/// One namespace: its entries and its time-to-live.
#[derive(Debug)]
struct Namespace {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Namespace {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }
}

/// Session-scoped response cache.
///
/// NOT a separate actor - owned by the Session and called via &mut self.
#[derive(Debug)]
pub struct ResponseCache {
    namespaces: HashMap<String, Namespace>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            namespaces: HashMap::new(),
            default_ttl,
        }
    }

    /// Override the time-to-live for a namespace. Applies to entries inserted
    /// before and after the call; age is always measured from insertion.
    pub fn set_ttl(&mut self, namespace: &str, ttl: Duration) {
        self.namespace_mut(namespace.to_string()).ttl = ttl;
    }

    /// Look up a value. Absent when never set or older than the namespace TTL;
    /// expired entries are removed on this access.
    pub fn get(&mut self, namespace: &str, key: &str) -> Option<String> {
        let ns = self.namespaces.get_mut(namespace)?;
        match ns.entries.get(key) {
            Some(entry) if entry.inserted.elapsed() <= ns.ttl => Some(entry.value.clone()),
            Some(_) => {
                ns.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Unconditional upsert; replaces the value and resets the entry's age.
    pub fn set(&mut self, namespace: &str, key: &str, value: impl Into<String>) {
        let entry = CacheEntry {
            value: value.into(),
            inserted: Instant::now(),
        };
        self.namespace_mut(namespace.to_string())
            .entries
            .insert(key.to_string(), entry);
    }

    /// Live (non-expired) entry count across all namespaces.
    pub fn len(&self) -> usize {
        self.namespaces
            .values()
            .map(|ns| {
                ns.entries
                    .values()
                    .filter(|e| e.inserted.elapsed() <= ns.ttl)
                    .count()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn namespace_mut(&mut self, name: String) -> &mut Namespace {
        let default_ttl = self.default_ttl;
        self.namespaces
            .entry(name)
            .or_insert_with(|| Namespace::new(default_ttl))
    }
}

// =============================================================================
// Tests
// =============================================================================
