//! Per-keyword preference memory used to stabilize repeated matches.
//!
//! Every search records the candidate title ids seen for its keyword; when a
//! comment fetch later resolves to a specific title, that title is pinned so
//! future automatic matches for the same keyword stick to it.

use crate::registry::FifoMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub candidate_ids: BTreeSet<u32>,
    pub preferred_id: Option<u32>,
}

/// Bounded FIFO memory of search keywords and their pinned titles.
pub struct PreferenceMemory {
    capacity: usize,
    entries: FifoMap<String, PreferenceEntry>,
}

impl PreferenceMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: FifoMap::new(),
        }
    }

    /// Record the candidate set seen for a keyword, preserving any prior
    /// pin and re-keying to the most-recent position.
    pub fn record(&mut self, keyword: &str, title_ids: impl IntoIterator<Item = u32>) {
        let candidate_ids: BTreeSet<u32> = title_ids.into_iter().collect();
        let preferred_id = self
            .entries
            .get(&keyword.to_string())
            .and_then(|e| e.preferred_id);
        self.entries.insert(
            keyword.to_string(),
            PreferenceEntry {
                candidate_ids,
                preferred_id,
            },
        );
        while self.entries.len() > self.capacity {
            self.entries.pop_oldest();
        }
    }

    /// Pin a title id into the first (oldest) entry whose candidates contain
    /// it. Returns the keyword that was pinned, if any.
    pub fn pin(&mut self, title_id: u32) -> Option<String> {
        let keyword = self
            .entries
            .iter()
            .find(|(_, entry)| entry.candidate_ids.contains(&title_id))
            .map(|(keyword, _)| keyword.clone())?;
        if let Some(entry) = self.entries.get_mut(&keyword) {
            entry.preferred_id = Some(title_id);
        }
        Some(keyword)
    }

    pub fn preferred_for(&self, keyword: &str) -> Option<u32> {
        self.entries
            .get(&keyword.to_string())
            .and_then(|e| e.preferred_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot for durable-store sync, oldest-first.
    pub fn snapshot(&self) -> Vec<(String, PreferenceEntry)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Adopt state read back from the durable store.
    pub fn restore(&mut self, entries: Vec<(String, PreferenceEntry)>) {
        self.entries = FifoMap::new();
        for (keyword, entry) in entries {
            self.entries.insert(keyword, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_preferred_for() {
        let mut prefs = PreferenceMemory::new(10);
        prefs.record("show", [1, 2, 3]);
        assert_eq!(prefs.preferred_for("show"), None);
        assert_eq!(prefs.preferred_for("other"), None);
    }

    #[test]
    fn test_pin_sets_preferred() {
        let mut prefs = PreferenceMemory::new(10);
        prefs.record("show", [1, 2, 3]);
        assert_eq!(prefs.pin(2), Some("show".to_string()));
        assert_eq!(prefs.preferred_for("show"), Some(2));
    }

    #[test]
    fn test_pin_unknown_candidate() {
        let mut prefs = PreferenceMemory::new(10);
        prefs.record("show", [1, 2]);
        assert_eq!(prefs.pin(99), None);
        assert_eq!(prefs.preferred_for("show"), None);
    }

    #[test]
    fn test_pin_first_match_wins() {
        let mut prefs = PreferenceMemory::new(10);
        prefs.record("older", [7]);
        prefs.record("newer", [7]);
        assert_eq!(prefs.pin(7), Some("older".to_string()));
        assert_eq!(prefs.preferred_for("older"), Some(7));
        assert_eq!(prefs.preferred_for("newer"), None);
    }

    #[test]
    fn test_rerecord_preserves_pin_and_moves_to_end() {
        let mut prefs = PreferenceMemory::new(2);
        prefs.record("a", [1]);
        prefs.record("b", [2]);
        prefs.pin(1);

        // Re-keying "a" makes "b" the oldest.
        prefs.record("a", [1, 5]);
        assert_eq!(prefs.preferred_for("a"), Some(1));

        prefs.record("c", [3]);
        assert_eq!(prefs.len(), 2);
        assert_eq!(prefs.preferred_for("b"), None);
        assert_eq!(prefs.preferred_for("a"), Some(1));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut prefs = PreferenceMemory::new(3);
        for i in 0..5u32 {
            prefs.record(&format!("k{}", i), [i]);
        }
        assert_eq!(prefs.len(), 3);
        let snapshot = prefs.snapshot();
        let keys: Vec<&str> = snapshot.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["k2", "k3", "k4"]);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut prefs = PreferenceMemory::new(10);
        prefs.record("show", [1, 2]);
        prefs.pin(1);

        let mut restored = PreferenceMemory::new(10);
        restored.restore(prefs.snapshot());
        assert_eq!(restored.preferred_for("show"), Some(1));
        assert_eq!(restored.len(), 1);
    }
}
