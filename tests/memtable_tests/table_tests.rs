//! MemTable Tests
//!
//! Tests verify:
//! - Basic upsert/get operations
//! - Size tracking
//! - Sorted iteration
//! - Clear functionality

use bytes::Bytes;
use lsmstore::memtable::MemTable;

// =============================================================================
// Helper Functions
// =============================================================================

fn bytes(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();
    assert_eq!(memtable.len(), 0);
    assert_eq!(memtable.size(), 0);
    assert!(memtable.is_empty());
}

#[test]
fn test_upsert_and_get() {
    let mut memtable = MemTable::new();

    assert!(memtable.upsert(bytes("key1"), bytes("value1")));

    assert_eq!(memtable.get(b"key1"), Some(bytes("value1")));
}

#[test]
fn test_get_nonexistent_key() {
    let memtable = MemTable::new();
    assert_eq!(memtable.get(b"nonexistent"), None);
}

#[test]
fn test_upsert_overwrites_existing() {
    let mut memtable = MemTable::new();

    assert!(memtable.upsert(bytes("key1"), bytes("value1")));
    assert!(!memtable.upsert(bytes("key1"), bytes("value2")));

    assert_eq!(memtable.len(), 1);
    assert_eq!(memtable.get(b"key1"), Some(bytes("value2")));
}

#[test]
fn test_empty_value_is_stored() {
    let mut memtable = MemTable::new();
    memtable.upsert(bytes("key1"), Bytes::new());

    assert_eq!(memtable.get(b"key1"), Some(Bytes::new()));
}

#[test]
fn test_delete_removes_key() {
    let mut memtable = MemTable::new();
    memtable.upsert(bytes("key1"), bytes("value1"));

    assert_eq!(memtable.delete(b"key1"), Some(bytes("value1")));
    assert_eq!(memtable.get(b"key1"), None);
    assert!(memtable.is_empty());
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_counts_key_and_value() {
    let mut memtable = MemTable::new();
    memtable.upsert(bytes("key1"), bytes("value1"));

    assert_eq!(memtable.size(), 4 + 6);
}

#[test]
fn test_size_grows_on_overwrite() {
    let mut memtable = MemTable::new();
    memtable.upsert(bytes("key1"), bytes("value1"));
    memtable.upsert(bytes("key1"), bytes("v2"));

    // Overwrites are never subtracted
    assert_eq!(memtable.size(), (4 + 6) + (4 + 2));
    assert_eq!(memtable.len(), 1);
}

#[test]
fn test_clear_resets_everything() {
    let mut memtable = MemTable::new();
    memtable.upsert(bytes("key1"), bytes("value1"));
    memtable.upsert(bytes("key2"), bytes("value2"));

    memtable.clear();

    assert!(memtable.is_empty());
    assert_eq!(memtable.size(), 0);
    assert_eq!(memtable.get(b"key1"), None);
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iter_is_sorted_by_bytes() {
    let mut memtable = MemTable::new();
    for key in ["key3", "key10", "key1", "key2"] {
        memtable.upsert(bytes(key), bytes(&format!("v-{}", key)));
    }

    let keys: Vec<&[u8]> = memtable.iter().map(|(k, _)| k.as_ref()).collect();
    assert_eq!(
        keys,
        vec![&b"key1"[..], &b"key10"[..], &b"key2"[..], &b"key3"[..]]
    );
}

#[test]
fn test_iter_reports_exact_len() {
    let mut memtable = MemTable::new();
    for i in 0..7 {
        memtable.upsert(bytes(&format!("key{}", i)), bytes("v"));
    }

    let iter = memtable.iter();
    assert_eq!(iter.len(), 7);
}
