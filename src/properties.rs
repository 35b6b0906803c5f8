//! Bounded property map produced by flattening a descriptor
//!
//! The image store caps the number of properties a single image may carry, so
//! the map stops accepting writes once it holds [`MAX_PROPERTIES`] entries.
//! Rejected writes are counted rather than silently lost.

use std::collections::HashMap;

/// Maximum number of properties the image store accepts per image
pub const MAX_PROPERTIES: usize = 128;

/// Insertion-ordered key/value map with a hard entry limit
///
/// Overwriting an existing key keeps its original position. A write is only
/// accepted while the map holds fewer than `capacity` entries, which means an
/// overwrite of an existing key is also rejected once the map is full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    capacity: usize,
    dropped: usize,
}

impl PropertyMap {
    /// Create an empty map holding at most [`MAX_PROPERTIES`] entries
    pub fn new() -> Self {
        Self::with_capacity(MAX_PROPERTIES)
    }

    /// Create an empty map with a custom entry limit
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            capacity,
            dropped: 0,
        }
    }

    /// Store `value` under `key`
    ///
    /// Returns `false` when the map is full and the write was dropped.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        if self.is_full() {
            self.dropped += 1;
            return false;
        }

        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
        true
    }

    /// Look up the value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries this map accepts
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether further writes will be dropped
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Number of writes rejected because the map was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Default for PropertyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        fn as_strs(entry: &(String, String)) -> (&str, &str) {
            (entry.0.as_str(), entry.1.as_str())
        }
        self.entries
            .iter()
            .map(as_strs as fn(&'a (String, String)) -> (&'a str, &'a str))
    }
}
