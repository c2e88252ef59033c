//! Write-through synchronization of registry and preference state with
//! content-hash dirty-checking.
//!
//! Cold start issues one batched read per process lifetime; every mutation
//! epoch writes only the keys whose serialized content changed since the
//! last acknowledged write. A key whose write fails keeps its old hash so
//! the next epoch retries just that key.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::{DurableStore, StoreError};

pub const KEY_TITLES: &str = "titles";
pub const KEY_EPISODES: &str = "episodes";
pub const KEY_EPISODE_COUNTER: &str = "episodeCounter";
pub const KEY_PREFERENCES: &str = "preferenceMemory";

const TRACKED_KEYS: [&str; 4] = [KEY_TITLES, KEY_EPISODES, KEY_EPISODE_COUNTER, KEY_PREFERENCES];

/// Serialized state for one sync epoch, in tracked-key order.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub titles: String,
    pub episodes: String,
    pub episode_counter: String,
    pub preferences: String,
}

impl StateSnapshot {
    fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            (KEY_TITLES, &self.titles),
            (KEY_EPISODES, &self.episodes),
            (KEY_EPISODE_COUNTER, &self.episode_counter),
            (KEY_PREFERENCES, &self.preferences),
        ]
    }
}

/// Raw values read back on cold start, in tracked-key order.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub titles: Option<String>,
    pub episodes: Option<String>,
    pub episode_counter: Option<String>,
    pub preferences: Option<String>,
}

pub struct SyncState {
    store: Arc<dyn DurableStore>,
    initialized: bool,
    /// Content hash of the last value the store acknowledged, per key.
    acked_hashes: HashMap<&'static str, String>,
}

impl SyncState {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            initialized: false,
            acked_hashes: HashMap::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// One batched read on first call; later calls return `None` without
    /// touching the store. Marked initialized even on failure to avoid
    /// retry storms.
    pub async fn load(&mut self) -> Option<LoadedState> {
        if self.initialized {
            return None;
        }
        self.initialized = true;

        match self.store.multi_get(&TRACKED_KEYS).await {
            Ok(values) => {
                let mut loaded = LoadedState::default();
                let mut it = values.into_iter();
                loaded.titles = it.next().flatten();
                loaded.episodes = it.next().flatten();
                loaded.episode_counter = it.next().flatten();
                loaded.preferences = it.next().flatten();

                // Adopted values are in sync by definition.
                for (key, value) in [
                    (KEY_TITLES, &loaded.titles),
                    (KEY_EPISODES, &loaded.episodes),
                    (KEY_EPISODE_COUNTER, &loaded.episode_counter),
                    (KEY_PREFERENCES, &loaded.preferences),
                ] {
                    if let Some(v) = value {
                        self.acked_hashes.insert(key, content_hash(v));
                    }
                }
                info!(
                    titles = loaded.titles.is_some(),
                    preferences = loaded.preferences.is_some(),
                    "loaded durable state"
                );
                Some(loaded)
            }
            Err(e) => {
                warn!(error = %e, "cold-start read from durable store failed");
                None
            }
        }
    }

    /// Write the keys whose content changed since the last acknowledged
    /// write. Returns how many keys were written successfully.
    pub async fn sync(&mut self, snapshot: &StateSnapshot) -> Result<usize, StoreError> {
        let dirty: Vec<(String, String)> = snapshot
            .pairs()
            .iter()
            .filter(|(key, value)| {
                self.acked_hashes.get(key).map(|h| h.as_str()) != Some(content_hash(value).as_str())
            })
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        if dirty.is_empty() {
            return Ok(0);
        }

        let acks = self.store.pipeline_set(&dirty).await?;
        let mut written = 0;
        for ((key, value), acked) in dirty.iter().zip(acks) {
            if acked {
                // Safe: keys come from TRACKED_KEYS.
                if let Some(tracked) = TRACKED_KEYS.iter().find(|k| *k == key) {
                    self.acked_hashes.insert(tracked, content_hash(value));
                }
                written += 1;
            } else {
                warn!(key, "store did not acknowledge write, will retry next epoch");
            }
        }
        Ok(written)
    }
}

fn content_hash(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
