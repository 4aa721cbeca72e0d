//! Bounded read-mostly memoization.
//!
//! The normalization engine memoizes a handful of pure functions (identifier
//! normalization, month-name correction, last-day-of-month, period
//! resolution) whose inputs recur across thousands of documents. Entries are
//! pure functions of their key, so concurrent readers may populate the same
//! entry redundantly without coordination beyond the lock itself.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// A bounded memoization map.
///
/// Once `capacity` entries are stored, further results are still returned to
/// the caller but no longer retained. Caches are owned by the value objects
/// that use them ([`Normalizer`](crate::ident::Normalizer),
/// [`PeriodResolver`](crate::period::PeriodResolver)) rather than hidden in
/// process globals, so tests can reset them deterministically.
#[derive(Debug)]
pub struct Memo<K, V> {
    capacity: usize,
    entries: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    /// Creates an empty memo retaining at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the memoized value for `key`, computing and (capacity
    /// permitting) retaining it on a miss.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.entries.read().expect("memo lock poisoned").get(&key) {
            return value.clone();
        }
        let value = compute();
        let mut entries = self.entries.write().expect("memo lock poisoned");
        if entries.len() < self.capacity {
            entries.insert(key, value.clone());
        }
        value
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("memo lock poisoned").len()
    }

    /// Returns true if nothing has been retained yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every retained entry.
    pub fn clear(&self) {
        self.entries.write().expect("memo lock poisoned").clear();
    }
}
