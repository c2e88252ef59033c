//! An ordered map with O(1) insert, move-to-end and pop-oldest.
//!
//! The order queue holds sequence-stamped keys; a queue entry is live only
//! if its stamp matches the map slot, so re-inserting a key just pushes a
//! fresh stamp instead of scanning the queue. Stale entries are skipped on
//! pop and compacted away once they outnumber the live ones.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

struct Slot<V> {
    value: V,
    seq: u64,
}

pub struct FifoMap<K, V> {
    map: HashMap<K, Slot<V>>,
    order: VecDeque<(K, u64)>,
    next_seq: u64,
}

impl<K: Clone + Eq + Hash, V> FifoMap<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
        }
    }

    /// Insert or replace. An existing key moves to the most-recent position;
    /// the previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((key.clone(), seq));
        let old = self.map.insert(key, Slot { value, seq });
        self.maybe_compact();
        old.map(|slot| slot.value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key).map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.get_mut(key).map(|slot| &mut slot.value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key).map(|slot| slot.value)
    }

    /// Remove and return the oldest live entry.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        while let Some((key, seq)) = self.order.pop_front() {
            match self.map.remove(&key) {
                Some(slot) if slot.seq == seq => return Some((key, slot.value)),
                // Stale stamp: put the live slot back and keep scanning.
                Some(slot) => {
                    self.map.insert(key, slot);
                }
                None => {}
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate live entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().filter_map(move |(key, seq)| {
            self.map
                .get(key)
                .filter(|slot| slot.seq == *seq)
                .map(|slot| (key, &slot.value))
        })
    }

    fn maybe_compact(&mut self) {
        if self.order.len() > self.map.len() * 2 + 16 {
            let map = &self.map;
            self.order
                .retain(|(key, seq)| matches!(map.get(key), Some(slot) if slot.seq == *seq));
        }
    }
}

impl<K: Clone + Eq + Hash, V> Default for FifoMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
