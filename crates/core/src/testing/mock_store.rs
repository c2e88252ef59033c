//! In-memory durable store with failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{DurableStore, StoreError};

/// A key-value store backed by a map, with per-key write rejection and
/// whole-store failure modes.
pub struct MockStore {
    data: RwLock<HashMap<String, String>>,
    rejected: RwLock<HashSet<String>>,
    fail: bool,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            rejected: RwLock::new(HashSet::new()),
            fail: false,
            get_calls: AtomicUsize::new(0),
            set_calls: AtomicUsize::new(0),
        }
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Seed a value.
    pub async fn put(&self, key: &str, value: &str) {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        self.data.read().await.get(key).cloned()
    }

    /// Refuse to acknowledge writes to this key.
    pub async fn reject_key(&self, key: &str) {
        self.rejected.write().await.insert(key.to_string());
    }

    /// Clear all write rejections.
    pub async fn accept_all(&self) {
        self.rejected.write().await.clear();
    }

    /// Number of `multi_get` round trips.
    pub async fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `pipeline_set` round trips.
    pub async fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for MockStore {
    async fn multi_get(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::ConnectionFailed("mock failure".to_string()));
        }
        let data = self.data.read().await;
        Ok(keys.iter().map(|k| data.get(*k).cloned()).collect())
    }

    async fn pipeline_set(&self, pairs: &[(String, String)]) -> Result<Vec<bool>, StoreError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::ConnectionFailed("mock failure".to_string()));
        }
        let rejected = self.rejected.read().await.clone();
        let mut data = self.data.write().await;
        Ok(pairs
            .iter()
            .map(|(key, value)| {
                if rejected.contains(key) {
                    false
                } else {
                    data.insert(key.clone(), value.clone());
                    true
                }
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::ConnectionFailed("mock failure".to_string()));
        }
        Ok(())
    }
}
