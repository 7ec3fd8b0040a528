//! Ordered, id-keyed container used by the store.
//!
//! Both upsert operations replace the value of an existing key in place; they
//! differ only in where a *new* key lands. Callers pick the policy by name so
//! that ordering never depends on how a list happens to be spliced.

use indexmap::IndexMap;

/// An insertion-ordered map from string ids to values.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedIndex<V> {
    entries: IndexMap<String, V>,
}

impl<V> OrderedIndex<V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert or replace `value` under `key`.
    ///
    /// An existing key keeps its position; a new key is appended at the back.
    /// Returns the previous value, if any.
    pub fn upsert_preserving_position(
        &mut self,
        key: impl Into<String>,
        value: V,
    ) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    /// Insert or replace `value` under `key`.
    ///
    /// An existing key keeps its position; a new key is placed at index 0.
    /// Returns the previous value, if any.
    pub fn upsert_to_front(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some(slot) = self.entries.get_mut(&key) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.shift_insert(0, key, value);
        None
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Values in display order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }
}

impl<V> Default for OrderedIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}
