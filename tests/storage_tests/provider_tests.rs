//! Tests for the storage providers and the memtable/WAL pair
//!
//! These tests verify:
//! - Filesystem layout and naming of WALs and run directories
//! - Runs become visible only once published
//! - Abandoned runs are cleaned up
//! - The in-memory provider mirrors the filesystem one

use std::fs;
use std::io::Cursor;
use std::path::Path;

use lsmstore::storage::{FsStorageProvider, MemoryStorageProvider, StorageProvider};
use lsmstore::wal::{EntryV1, WalReader, WAL_EXTENSION};
use lsmstore::{Config, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_fs_provider() -> (TempDir, FsStorageProvider) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let provider = FsStorageProvider::new(&config).unwrap();
    (temp_dir, provider)
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// "<counter>-<unix>" with both parts numeric
fn assert_generated_name(name: &str) {
    let (counter, unix) = name.split_once('-').expect("name has a dash");
    assert!(counter.parse::<u64>().is_ok(), "bad counter in {}", name);
    assert!(unix.parse::<u64>().is_ok(), "bad timestamp in {}", name);
}

fn write_and_publish(provider: &dyn StorageProvider, pairs: &[(&str, &str)]) -> u64 {
    let mut pending = provider.new_table_writer().unwrap();
    for (key, value) in pairs {
        pending.writer.write(key.as_bytes(), value.as_bytes()).unwrap();
    }
    pending.writer.close().unwrap();
    provider.publish_table(pending.id).unwrap();
    pending.id
}

// =============================================================================
// Filesystem Provider Tests
// =============================================================================

#[test]
fn test_fs_provider_creates_layout() {
    let (temp, provider) = setup_fs_provider();

    assert!(temp.path().join("wal").is_dir());
    assert!(temp.path().join("tables").is_dir());
    assert_eq!(provider.wal_dir(), temp.path().join("wal"));
    assert_eq!(provider.tables_dir(), temp.path().join("tables"));
    assert_eq!(provider.table_count(), 0);
}

#[test]
fn test_fs_provider_rejects_invalid_config() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .sparse_key_distance(0)
        .build();

    assert!(matches!(FsStorageProvider::new(&config), Err(StoreError::Config(_))));
}

#[test]
fn test_memory_storage_writes_wal_file() {
    let (_temp, provider) = setup_fs_provider();

    let storage = provider.new_memory_storage().unwrap();
    storage.put("key1".into(), "value1".into()).unwrap();
    storage.put("key2".into(), "value2".into()).unwrap();

    let wal_path = storage.wal_path().unwrap();
    assert_eq!(wal_path.parent().unwrap(), provider.wal_dir());
    assert_eq!(wal_path.extension().unwrap(), WAL_EXTENSION);
    assert_generated_name(wal_path.file_stem().unwrap().to_str().unwrap());

    let entries: Vec<EntryV1> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries, vec![EntryV1::new("key1", "value1"), EntryV1::new("key2", "value2")]);
}

#[test]
fn test_wal_names_are_unique() {
    let (_temp, provider) = setup_fs_provider();

    let paths: Vec<_> = (0..5)
        .map(|_| provider.new_memory_storage().unwrap().wal_path().unwrap())
        .collect();

    let names = dir_entries(provider.wal_dir());
    assert_eq!(names.len(), 5);
    for path in paths {
        assert!(path.exists());
    }
}

#[test]
fn test_pending_table_is_invisible_until_published() {
    let (_temp, provider) = setup_fs_provider();

    let mut pending = provider.new_table_writer().unwrap();
    pending.writer.write(b"key1", b"value1").unwrap();
    pending.writer.close().unwrap();

    assert!(provider.files_storage().unwrap().is_empty());

    provider.publish_table(pending.id).unwrap();

    let tables = provider.files_storage().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].id(), pending.id);
    assert_eq!(tables[0].find(b"key1").unwrap(), Some(b"value1".to_vec()));
}

#[test]
fn test_published_table_directory_has_three_files() {
    let (_temp, provider) = setup_fs_provider();
    write_and_publish(&provider, &[("key1", "value1"), ("key2", "value2")]);

    let dirs = dir_entries(provider.tables_dir());
    assert_eq!(dirs.len(), 1);
    assert_generated_name(&dirs[0]);

    let table_dir = provider.tables_dir().join(&dirs[0]);
    let files = dir_entries(&table_dir);
    assert_eq!(files, vec!["data.db", "index.db", "sparse.db"]);
    for file in files {
        assert!(fs::metadata(table_dir.join(file)).unwrap().len() > 0);
    }
}

#[test]
fn test_files_storage_is_oldest_first() {
    let (_temp, provider) = setup_fs_provider();

    let first = write_and_publish(&provider, &[("key", "old")]);
    let second = write_and_publish(&provider, &[("key", "new")]);

    let tables = provider.files_storage().unwrap();
    let ids: Vec<u64> = tables.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(second > first);
}

#[test]
fn test_abandon_removes_directory() {
    let (_temp, provider) = setup_fs_provider();

    let pending = provider.new_table_writer().unwrap();
    assert_eq!(dir_entries(provider.tables_dir()).len(), 1);

    provider.abandon_table(pending.id).unwrap();

    assert!(dir_entries(provider.tables_dir()).is_empty());
    assert!(matches!(
        provider.publish_table(pending.id),
        Err(StoreError::UnknownTable(_))
    ));
}

#[test]
fn test_failed_publish_can_be_abandoned() {
    let (_temp, provider) = setup_fs_provider();

    let mut pending = provider.new_table_writer().unwrap();
    pending.writer.write(b"key1", b"value1").unwrap();
    pending.writer.close().unwrap();

    let table_dir = provider.tables_dir().join(&dir_entries(provider.tables_dir())[0]);
    fs::remove_file(table_dir.join("index.db")).unwrap();

    assert!(matches!(provider.publish_table(pending.id), Err(StoreError::Io(_))));
    assert!(provider.files_storage().unwrap().is_empty());

    provider.abandon_table(pending.id).unwrap();
    assert!(!table_dir.exists());
    assert!(dir_entries(provider.tables_dir()).is_empty());
}

#[test]
fn test_publish_unknown_table() {
    let (_temp, provider) = setup_fs_provider();
    assert!(matches!(provider.publish_table(42), Err(StoreError::UnknownTable(42))));
}

#[test]
fn test_discard_deletes_wal_and_clears_memtable() {
    let (_temp, provider) = setup_fs_provider();

    let storage = provider.new_memory_storage().unwrap();
    storage.put("key1".into(), "value1".into()).unwrap();
    let wal_path = storage.wal_path().unwrap();

    storage.discard().unwrap();

    assert!(!wal_path.exists());
    assert!(storage.is_empty());
    assert_eq!(storage.get(b"key1"), None);
    assert!(storage.put("key2".into(), "value2".into()).is_err());
}

// =============================================================================
// Memory Storage Tests
// =============================================================================

#[test]
fn test_memory_storage_tracks_size() {
    let provider = MemoryStorageProvider::default();
    let storage = provider.new_memory_storage().unwrap();

    storage.put("key1".into(), "value1".into()).unwrap();
    storage.put("k2".into(), "v".into()).unwrap();

    assert_eq!(storage.len(), 2);
    assert_eq!(storage.size(), 10 + 3);
}

#[test]
fn test_rejected_entry_leaves_memtable_untouched() {
    let provider = MemoryStorageProvider::default();
    let storage = provider.new_memory_storage().unwrap();

    let err = storage.put("".into(), "value".into()).unwrap_err();
    assert!(matches!(err, StoreError::EmptyKey));
    assert!(storage.is_empty());
    assert!(provider.wal_buffer(0).unwrap().is_empty());
}

#[test]
fn test_write_to_drains_in_key_order() {
    let provider = MemoryStorageProvider::new(2);
    let storage = provider.new_memory_storage().unwrap();
    for key in ["key3", "key1", "key10", "key2"] {
        storage.put(key.into(), format!("v-{}", key).into()).unwrap();
    }

    let mut pending = provider.new_table_writer().unwrap();
    assert_eq!(storage.write_to(&mut pending.writer).unwrap(), 4);
    assert_eq!(pending.writer.keys(), 4);
    pending.writer.close().unwrap();
    provider.publish_table(pending.id).unwrap();

    let tables = provider.files_storage().unwrap();
    let table = &tables[0];
    for key in ["key1", "key10", "key2", "key3"] {
        let expected = format!("v-{}", key).into_bytes();
        assert_eq!(table.find(key.as_bytes()).unwrap(), Some(expected));
    }
}

// =============================================================================
// Memory Provider Tests
// =============================================================================

#[test]
fn test_memory_provider_wal_buffers() {
    let provider = MemoryStorageProvider::default();

    let storage = provider.new_memory_storage().unwrap();
    storage.put("key1".into(), "value1".into()).unwrap();

    assert_eq!(provider.wal_count(), 1);
    assert!(storage.wal_path().is_none());

    let wal = provider.wal_buffer(0).unwrap().snapshot();
    let entries: Vec<EntryV1> = WalReader::new(Cursor::new(wal))
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries, vec![EntryV1::new("key1", "value1")]);
}

#[test]
fn test_memory_provider_publish_and_abandon() {
    let provider = MemoryStorageProvider::default();

    let id = write_and_publish(&provider, &[("key1", "value1")]);
    let abandoned = provider.new_table_writer().unwrap();
    assert_eq!(provider.pending_count(), 1);

    provider.abandon_table(abandoned.id).unwrap();

    assert_eq!(provider.pending_count(), 0);
    assert_eq!(provider.table_count(), 1);
    assert_eq!(provider.files_storage().unwrap()[0].id(), id);
}

#[test]
fn test_memory_provider_injected_failure() {
    let provider = MemoryStorageProvider::default();
    provider.fail_next_table_writes(1);

    let mut failing = provider.new_table_writer().unwrap();
    let err = failing.writer.write(b"key1", b"value1").unwrap_err();
    assert!(matches!(err, StoreError::Stage { .. }));

    let mut healthy = provider.new_table_writer().unwrap();
    assert!(healthy.writer.write(b"key1", b"value1").is_ok());
}
