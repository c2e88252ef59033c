//! Minute-granularity TTL cache used in front of search and comment fetches.
//!
//! Expiry is checked lazily on read; there is no background sweep. Between
//! expiries the map is unbounded, which is acceptable because keys are
//! request-driven and short-lived.

use std::collections::HashMap;
use tokio::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// A TTL-keyed cache. `get` evicts expired entries on access, `set`
/// unconditionally overwrites with a fresh timestamp.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_minutes: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_minutes * 60),
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
