//! In-memory key index
//!
//! The only structure that knows where a slot-stored key's bytes live.
//! One map per size class; lookups scan across classes, which is linear in
//! the number of configured classes, not in the number of keys.

use std::collections::{BTreeMap, HashMap};

/// Key → (size class, offset) directory for slot-stored values.
#[derive(Debug, Default)]
pub struct KeyIndex {
    by_class: BTreeMap<usize, HashMap<String, u64>>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the mapping for `key` in `size_class`.
    pub fn record(&mut self, size_class: usize, key: String, offset: u64) {
        self.by_class.entry(size_class).or_default().insert(key, offset);
    }

    /// Find the size class and offset holding `key`, if any.
    pub fn locate(&self, key: &str) -> Option<(usize, u64)> {
        for (&size_class, keys) in &self.by_class {
            if let Some(&offset) = keys.get(key) {
                return Some((size_class, offset));
            }
        }
        None
    }

    /// Offset of `key` within a specific size class. Used for in-place
    /// overwrites where the class did not change.
    pub fn offset_of(&self, size_class: usize, key: &str) -> Option<u64> {
        self.by_class.get(&size_class)?.get(key).copied()
    }

    /// Remove the mapping for `key`, returning where it lived. The slot
    /// bytes themselves are untouched.
    pub fn forget(&mut self, key: &str) -> Option<(usize, u64)> {
        for (&size_class, keys) in self.by_class.iter_mut() {
            if let Some(offset) = keys.remove(key) {
                return Some((size_class, offset));
            }
        }
        None
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_class.values().any(|keys| keys.contains_key(key))
    }

    /// Number of keys currently indexed across all classes.
    pub fn len(&self) -> usize {
        self.by_class.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_class.clear();
    }
}
