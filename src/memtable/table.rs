//! MemTable implementation

use std::collections::btree_map;
use std::collections::BTreeMap;

use bytes::Bytes;

/// Ordered in-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<Bytes, Bytes>,
    /// Grows by `key.len() + value.len()` on every upsert and is never
    /// decremented, so it overestimates after overwrites or deletes.
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Returns true when the key was not present.
    pub fn upsert(&mut self, key: Bytes, value: Bytes) -> bool {
        self.size += key.len() + value.len();
        self.data.insert(key, value).is_none()
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.data.get(key).cloned()
    }

    /// Remove a key, returning the value it held
    pub fn delete(&mut self, key: &[u8]) -> Option<Bytes> {
        self.data.remove(key)
    }

    /// Estimated size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop every entry and reset the size estimate
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }

    /// Entries in ascending key order
    pub fn iter(&self) -> MemTableIterator<'_> {
        MemTableIterator {
            inner: self.data.iter(),
        }
    }
}

/// Iterator over MemTable entries in ascending key order
pub struct MemTableIterator<'a> {
    inner: btree_map::Iter<'a, Bytes, Bytes>,
}

impl<'a> Iterator for MemTableIterator<'a> {
    type Item = (&'a Bytes, &'a Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for MemTableIterator<'_> {}
