//! # lsmstore
//!
//! An embeddable log-structured merge (LSM) key-value engine with:
//! - Write-Ahead Logging (WAL) per memtable for durability
//! - Background flushing of full memtables into immutable SSTables
//! - Sparse-index point lookups across memtables and on-disk runs
//! - Pluggable storage providers (filesystem or in-memory)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                           Tree                              │
//! │              put / get / flush / wait_for_flushes           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐   rotate   ┌──────────────┐
//!   │     WAL     │◄─────────│    Active    │───────────►│   Flushing   │
//!   │  (Append)   │  paired  │   MemTable   │            │  MemTables   │
//!   └─────────────┘          └──────────────┘            └──────┬───────┘
//!                                                               │ flusher
//!                                                               ▼
//!                                                        ┌──────────────┐
//!                                                        │   SSTables   │
//!                                                        │ data / index │
//!                                                        │ / sparse     │
//!                                                        └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lsmstore::{Config, Tree};
//!
//! let config = Config::builder().data_dir("/tmp/lsmstore").build();
//! let tree = Tree::open(config)?;
//!
//! tree.put("key1", "value1")?;
//! assert_eq!(tree.get(b"key1")?.as_deref(), Some(&b"value1"[..]));
//! # Ok::<(), lsmstore::StoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod sink;
pub mod checksum;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod tree;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, Stage, StoreError};
pub use config::{Config, WalSyncStrategy};
pub use tree::{Tree, TreeStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lsmstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
