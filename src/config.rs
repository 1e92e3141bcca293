//! Configuration for lsmstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Main configuration for a tree instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal/<counter>-<unix>.wal
    ///     └── tables/<counter>-<unix>/{data,index,sparse}.db
    pub data_dir: PathBuf,

    /// Number of keys between two sparse index samples
    pub sparse_key_distance: usize,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Estimated memtable size (in bytes) above which it is rotated out
    pub memory_threshold: usize,

    // -------------------------------------------------------------------------
    // Flush Configuration
    // -------------------------------------------------------------------------
    /// Extra drain attempts after the first failure
    pub flush_retries: u32,

    /// Backoff before retry N is `N * flush_retry_backoff`
    pub flush_retry_backoff: Duration,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./lsmstore_data"),
            sparse_key_distance: 5,
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            memory_threshold: 4 * 1024 * 1024, // 4 MB
            flush_retries: 3,
            flush_retry_backoff: Duration::from_millis(50),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sparse_key_distance == 0 {
            return Err(StoreError::Config(
                "sparse_key_distance must be at least 1".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(StoreError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the memory threshold (in bytes)
    pub fn memory_threshold(mut self, bytes: usize) -> Self {
        self.config.memory_threshold = bytes;
        self
    }

    /// Set the sparse index distance
    pub fn sparse_key_distance(mut self, distance: usize) -> Self {
        self.config.sparse_key_distance = distance;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set how many times a failed flush is retried
    pub fn flush_retries(mut self, retries: u32) -> Self {
        self.config.flush_retries = retries;
        self
    }

    /// Set the base backoff between flush retries
    pub fn flush_retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.flush_retry_backoff = backoff;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
