//! Tree Module
//!
//! The engine façade that coordinates memtables, background flushes and
//! on-disk runs.
//!
//! ## Responsibilities
//! - Serialize writes against the active memtable/WAL pair
//! - Rotate the active memtable once it outgrows the memory threshold
//! - Drain rotated memtables into SSTables on a background thread, oldest
//!   generation first
//! - Tiered lookup: active → flushing (newest first) → runs (newest first)
//!
//! ## Memtable Lifecycle
//! ```text
//!            rotate              drain ok
//!  active ──────────► flushing ───────────► discarded
//!                      │    ▲
//!          retries     │    │ retry_failed_flushes()
//!          exhausted   ▼    │
//!                   flush-failed
//! ```
//!
//! A memtable in `flush-failed` keeps its WAL and stays readable; its data
//! is never dropped. Newer memtables queue behind it in the flushing set
//! until it drains, so runs are always published in rotation order and
//! every flushing memtable is newer than every run.

use std::collections::BTreeMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::config::Config;
use crate::error::Result;
use crate::storage::{FsStorageProvider, MemoryStorage, PendingTable, StorageProvider};

/// Snapshot of the tree's tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Estimated size of the active memtable
    pub active_size: usize,
    /// Entries in the active memtable
    pub active_entries: usize,
    /// Rotated memtables queued, being drained, or waiting behind a failed one
    pub flushing: usize,
    /// Rotated memtables whose drain exhausted its retries
    pub failed: usize,
    /// Published on-disk runs
    pub runs: usize,
}

/// An LSM tree
///
/// ## Concurrency Model
///
/// - **Puts** hold the `active` write lock across WAL append, memtable
///   upsert and the threshold check, so rotation is atomic with respect to
///   other puts.
/// - **Gets** take the `active` read lock, then the `flushing` read lock,
///   then consult the provider's runs. No two of these locks are held at
///   once.
/// - **Drains** run on a dedicated flusher thread and only take the
///   `flushing` lock.
pub struct Tree {
    shared: Arc<Shared>,
    flush_tx: Option<Sender<u64>>,
    flusher: Option<JoinHandle<()>>,
}

/// State shared with the flusher thread
struct Shared {
    config: Config,
    provider: Arc<dyn StorageProvider>,

    /// The memtable receiving writes
    active: RwLock<Arc<MemoryStorage>>,

    /// Rotated memtables by generation; higher generations are newer
    flushing: RwLock<BTreeMap<u64, Flushing>>,
    next_generation: AtomicU64,

    /// Flusher wake-ups queued or running
    in_flight: Mutex<usize>,
    idle: Condvar,
}

struct Flushing {
    storage: Arc<MemoryStorage>,
    state: FlushState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushState {
    Flushing,
    Failed { attempts: u32 },
}

impl Tree {
    /// Create a tree on top of any storage provider
    pub fn new(provider: Arc<dyn StorageProvider>, config: Config) -> Result<Self> {
        config.validate()?;

        let active = provider.new_memory_storage()?;
        let shared = Arc::new(Shared {
            config,
            provider,
            active: RwLock::new(Arc::new(active)),
            flushing: RwLock::new(BTreeMap::new()),
            next_generation: AtomicU64::new(1),
            in_flight: Mutex::new(0),
            idle: Condvar::new(),
        });

        let (flush_tx, flush_rx) = channel::unbounded();
        let worker = Arc::clone(&shared);
        let flusher = thread::Builder::new()
            .name("lsmstore-flusher".to_string())
            .spawn(move || worker.run_flusher(flush_rx))?;

        Ok(Self {
            shared,
            flush_tx: Some(flush_tx),
            flusher: Some(flusher),
        })
    }

    /// Create a filesystem-backed tree rooted at `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let provider = FsStorageProvider::new(&config)?;
        Self::new(Arc::new(provider), config)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire the active write lock
    /// 2. Write to the WAL, then the memtable
    /// 3. Rotate if the memtable outgrew the threshold
    ///
    /// A WAL failure leaves the memtable untouched. A failure to provision
    /// the next memtable is logged and retried on the next put; the write
    /// itself already succeeded.
    pub fn put(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<()> {
        let mut active = self.shared.active.write();
        active.put(key.into(), value.into())?;

        if active.size() > self.shared.config.memory_threshold {
            if let Err(e) = self.rotate(&mut active) {
                tracing::warn!(error = %e, "could not rotate memtable, will retry on next put");
            }
        }

        Ok(())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. Active memtable
    /// 2. Flushing memtables, newest first
    /// 3. On-disk runs, newest first
    pub fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        if let Some(value) = self.shared.active.read().get(key) {
            return Ok(Some(value));
        }

        if let Some(value) = self.shared.find_in_flushing(key) {
            return Ok(Some(value));
        }

        self.shared.find_in_files(key)
    }

    /// Rotate the active memtable out regardless of its size
    ///
    /// Does nothing when the active memtable is empty. The drain itself runs
    /// in the background; see [`Tree::wait_for_flushes`].
    pub fn flush(&self) -> Result<()> {
        let mut active = self.shared.active.write();
        if active.is_empty() {
            return Ok(());
        }
        self.rotate(&mut active)
    }

    /// Block until no drain is queued or running
    ///
    /// Memtables stuck behind a failed drain stay in the flushing set; see
    /// [`Tree::retry_failed_flushes`].
    pub fn wait_for_flushes(&self) {
        let mut in_flight = self.shared.in_flight.lock();
        while *in_flight > 0 {
            self.shared.idle.wait(&mut in_flight);
        }
    }

    /// Re-queue every memtable whose drain exhausted its retries
    ///
    /// Returns how many were re-queued. The flusher then drains them, and
    /// anything queued behind them, oldest first.
    pub fn retry_failed_flushes(&self) -> usize {
        let requeued: Vec<u64> = {
            let mut flushing = self.shared.flushing.write();
            flushing
                .iter_mut()
                .filter_map(|(&generation, f)| match f.state {
                    FlushState::Failed { attempts } => {
                        tracing::info!(generation, attempts, "re-queueing failed flush");
                        f.state = FlushState::Flushing;
                        Some(generation)
                    }
                    FlushState::Flushing => None,
                })
                .collect()
        };

        if let Some(&oldest) = requeued.first() {
            self.schedule(oldest);
        }
        requeued.len()
    }

    pub fn stats(&self) -> Result<TreeStats> {
        let (active_size, active_entries) = {
            let active = self.shared.active.read();
            (active.size(), active.len())
        };

        let (flushing, failed) = {
            let flushing = self.shared.flushing.read();
            let failed = flushing
                .values()
                .filter(|f| matches!(f.state, FlushState::Failed { .. }))
                .count();
            (flushing.len() - failed, failed)
        };

        Ok(TreeStats {
            active_size,
            active_entries,
            flushing,
            failed,
            runs: self.shared.provider.files_storage()?.len(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Swap in a fresh memtable and queue the old one for draining
    ///
    /// Called with the active write lock held, so the swap, the flushing
    /// registration and the scheduling happen as one unit.
    fn rotate(&self, active: &mut Arc<MemoryStorage>) -> Result<()> {
        let fresh = Arc::new(self.shared.provider.new_memory_storage()?);
        let old = mem::replace(active, fresh);
        let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(generation, size = old.size(), entries = old.len(), "rotated memtable");

        self.shared.flushing.write().insert(
            generation,
            Flushing {
                storage: old,
                state: FlushState::Flushing,
            },
        );
        self.schedule(generation);

        Ok(())
    }

    /// Wake the flusher on behalf of `generation`
    fn schedule(&self, generation: u64) {
        *self.shared.in_flight.lock() += 1;

        let sent = match &self.flush_tx {
            Some(tx) => tx.send(generation).is_ok(),
            None => false,
        };
        if !sent {
            // The memtable stays readable in the flushing set
            tracing::error!(generation, "flusher is gone, memtable not scheduled");
            self.shared.finish_task();
        }
    }
}

impl Drop for Tree {
    /// Let queued drains finish, then stop the flusher
    fn drop(&mut self) {
        drop(self.flush_tx.take());
        if let Some(flusher) = self.flusher.take() {
            if flusher.join().is_err() {
                tracing::error!("flusher thread panicked");
            }
        }
    }
}

impl Shared {
    fn find_in_flushing(&self, key: &[u8]) -> Option<Bytes> {
        self.flushing
            .read()
            .values()
            .rev()
            .find_map(|f| f.storage.get(key))
    }

    fn find_in_files(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let tables = self.provider.files_storage()?;
        for table in tables.iter().rev() {
            if let Some(value) = table.find(key)? {
                return Ok(Some(Bytes::from(value)));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Flusher
    // =========================================================================

    fn run_flusher(&self, wakeups: Receiver<u64>) {
        // Ends once the tree drops its sender and the queue is empty
        for generation in wakeups.iter() {
            tracing::trace!(generation, "flusher woken");
            self.drain_in_order();
            self.finish_task();
        }
    }

    /// Drain the flushing set oldest first, stopping at a failed memtable
    fn drain_in_order(&self) {
        while let Some((generation, storage)) = self.oldest_pending() {
            if !self.flush_with_retries(generation, &storage) {
                break;
            }
        }
    }

    /// The oldest flushing memtable, unless it is waiting for a retry
    fn oldest_pending(&self) -> Option<(u64, Arc<MemoryStorage>)> {
        let flushing = self.flushing.read();
        let (&generation, oldest) = flushing.iter().next()?;
        match oldest.state {
            FlushState::Flushing => Some((generation, Arc::clone(&oldest.storage))),
            FlushState::Failed { .. } => {
                if flushing.len() > 1 {
                    tracing::debug!(
                        generation,
                        waiting = flushing.len() - 1,
                        "newer memtables held behind failed flush"
                    );
                }
                None
            }
        }
    }

    /// Returns whether the memtable was drained
    fn flush_with_retries(&self, generation: u64, storage: &MemoryStorage) -> bool {
        let attempts = self.config.flush_retries + 1;

        for attempt in 1..=attempts {
            match self.drain(generation, storage) {
                Ok((table, entries)) => {
                    tracing::info!(generation, table, entries, "flushed memtable");
                    return true;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        generation,
                        attempt,
                        error = %e,
                        "flush failed, retrying"
                    );
                    thread::sleep(self.config.flush_retry_backoff * attempt);
                }
                Err(e) => {
                    tracing::error!(
                        generation,
                        attempts,
                        error = %e,
                        "flush failed, memtable kept in memory"
                    );
                    if let Some(f) = self.flushing.write().get_mut(&generation) {
                        f.state = FlushState::Failed { attempts };
                    }
                }
            }
        }
        false
    }

    /// Write one memtable into a new run, publish it, then discard the
    /// memtable and its WAL. Returns the table id and entry count.
    fn drain(&self, generation: u64, storage: &MemoryStorage) -> Result<(u64, usize)> {
        let PendingTable { id, mut writer } = self.provider.new_table_writer()?;

        let written = storage
            .write_to(&mut writer)
            .and_then(|entries| writer.close().map(|_| entries))
            .and_then(|entries| self.provider.publish_table(id).map(|_| entries));
        let entries = match written {
            Ok(entries) => entries,
            Err(e) => {
                if let Err(abandon) = self.provider.abandon_table(id) {
                    tracing::warn!(table = id, error = %abandon, "could not remove partial table");
                }
                return Err(e);
            }
        };

        // The run is visible before the memtable leaves the flushing set
        self.flushing.write().remove(&generation);
        if let Err(e) = storage.discard() {
            tracing::warn!(generation, error = %e, "could not discard flushed memtable");
        }

        Ok((id, entries))
    }

    fn finish_task(&self) {
        let mut in_flight = self.in_flight.lock();
        *in_flight -= 1;
        if *in_flight == 0 {
            self.idle.notify_all();
        }
    }
}
