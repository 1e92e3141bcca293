//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for one memtable through append-only logging.
//!
//! ## Responsibilities
//! - Append every mutation before it reaches the memtable
//! - CRC32 checksums for corruption detection
//! - Sequential reading for inspection and replay
//!
//! ## Record Format
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │ Record                                          │
//! │ ┌──────────┬───────────────┬──────────────────┐ │
//! │ │ Len (4)  │ Payload (Len) │ CRC (4)          │ │
//! │ └──────────┴───────────────┴──────────────────┘ │
//! │   CRC32/IEEE over Len || Payload, little-endian │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry Payload (version 1)
//! ```text
//! ┌─────────┬────────────┬─────┬────────────┬───────┐
//! │ Ver (1) │ KeyLen (2) │ Key │ ValLen (2) │ Value │
//! └─────────┴────────────┴─────┴────────────┴───────┘
//! ```

mod entry;
mod reader;
mod writer;

pub use entry::{EntryV1, ENTRY_VERSION_V1};
pub use reader::{WalEntries, WalReader};
pub use writer::WalWriter;

/// Extension used for WAL files
pub const WAL_EXTENSION: &str = "wal";
