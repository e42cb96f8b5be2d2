//! Write-behind persistence queue
//!
//! Mutations push `DbCommand`s into a [`CommandSink`] on the owner thread.
//! [`PersistenceQueue::commit`] swaps the pending batch out and hands it to a
//! background task, which takes the single writer permit, applies the batch
//! in one transaction and releases the permit. The owner thread never waits
//! on disk except in [`PersistenceQueue::drain_and_wait`] at shutdown.
//!
//! Flushes run in commit order: each flush task waits for its predecessor
//! before asking for the permit. A failed batch is logged and dropped.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::DataError;
use crate::storage::command::DbCommand;
use crate::storage::database::Database;

/// Pending commands, shared by everything that mutates on the owner thread
///
/// Not `Send`: the in-memory state it belongs to lives on one thread.
#[derive(Debug, Clone, Default)]
pub struct CommandSink(Rc<RefCell<Vec<DbCommand>>>);

impl CommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cmd: DbCommand) {
        self.0.borrow_mut().push(cmd);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Take the pending batch, leaving an empty one behind
    pub fn take(&self) -> Vec<DbCommand> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    /// Copy of the pending commands, in enqueue order
    pub fn pending(&self) -> Vec<DbCommand> {
        self.0.borrow().clone()
    }
}

/// Counters describing flush activity since the queue was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub committed_batches: u64,
    pub failed_batches: u64,
    pub applied_commands: u64,
    /// Highest number of flush transactions ever open at the same time
    pub peak_concurrent_flushes: usize,
}

struct Writer {
    database: Database,
    permit: Semaphore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    committed: AtomicU64,
    failed: AtomicU64,
    applied: AtomicU64,
}

impl Writer {
    async fn flush(self: Arc<Self>, batch: Vec<DbCommand>) {
        // The semaphore is never closed.
        let Ok(_permit) = self.permit.acquire().await else {
            return;
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let count = batch.len();
        let writer = self.clone();
        let result = tokio::task::spawn_blocking(move || writer.database.apply_batch(&batch)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(Ok(elapsed)) => {
                self.committed.fetch_add(1, Ordering::SeqCst);
                self.applied.fetch_add(count as u64, Ordering::SeqCst);
                debug!(commands = count, ?elapsed, "Commit took");
            }
            Ok(Err(source)) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                let err = DataError::FlushFailed {
                    commands: count,
                    source,
                };
                error!(error = %err, "Dropping settings batch, in-memory state is ahead of disk");
            }
            Err(join_err) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                error!(error = %join_err, commands = count, "Settings flush task did not complete");
            }
        }
    }

    fn stats(&self) -> FlushStats {
        FlushStats {
            committed_batches: self.committed.load(Ordering::SeqCst),
            failed_batches: self.failed.load(Ordering::SeqCst),
            applied_commands: self.applied.load(Ordering::SeqCst),
            peak_concurrent_flushes: self.peak.load(Ordering::SeqCst),
        }
    }
}

/// Batches commands and flushes them on a tokio runtime
pub struct PersistenceQueue {
    sink: CommandSink,
    writer: Arc<Writer>,
    runtime: Handle,
    last_flush: Option<JoinHandle<()>>,
}

impl PersistenceQueue {
    /// Create a queue that flushes on `runtime`
    ///
    /// `runtime` must belong to a multi-thread runtime: [`Self::drain_and_wait`]
    /// blocks the calling thread, and a current-thread runtime would never
    /// get to poll the flush tasks it waits on.
    pub fn new(database: Database, sink: CommandSink, runtime: Handle) -> Self {
        debug_assert_eq!(
            runtime.runtime_flavor(),
            RuntimeFlavor::MultiThread,
            "settings flushes need a multi-thread runtime"
        );
        Self {
            sink,
            writer: Arc::new(Writer {
                database,
                permit: Semaphore::new(1),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                committed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                applied: AtomicU64::new(0),
            }),
            runtime,
            last_flush: None,
        }
    }

    pub fn sink(&self) -> &CommandSink {
        &self.sink
    }

    pub fn enqueue(&self, cmd: DbCommand) {
        self.sink.push(cmd);
    }

    /// Number of commands waiting for the next commit
    pub fn pending(&self) -> usize {
        self.sink.len()
    }

    /// Start flushing everything queued so far
    ///
    /// Returns without waiting for the write. Commands enqueued after this
    /// call form the next batch.
    pub fn commit(&mut self) {
        if self.sink.is_empty() {
            return;
        }

        let batch = self.sink.take();
        debug!(commands = batch.len(), "Committing config to disk");
        for cmd in &batch {
            trace!(command = %cmd.describe(), "Queued for flush");
        }

        let writer = self.writer.clone();
        let previous = self.last_flush.take();
        self.last_flush = Some(self.runtime.spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            writer.flush(batch).await;
        }));
    }

    /// Commit, then block until every flush has finished
    ///
    /// Must be called from outside the runtime's worker threads, and the
    /// runtime must be multi-threaded so flushes keep running while this
    /// thread blocks. There is no timeout: a stuck disk blocks shutdown.
    pub fn drain_and_wait(&mut self) {
        self.commit();

        let last = self.last_flush.take();
        let writer = self.writer.clone();
        self.runtime.block_on(async move {
            if let Some(last) = last {
                if let Err(e) = last.await {
                    error!(error = %e, "Settings flush task panicked");
                }
            }
            let _permit = writer.permit.acquire().await;
        });
    }

    pub fn stats(&self) -> FlushStats {
        self.writer.stats()
    }
}

impl Drop for PersistenceQueue {
    fn drop(&mut self) {
        if !self.sink.is_empty() {
            warn!(
                commands = self.sink.len(),
                "Settings queue dropped with uncommitted changes"
            );
        }
    }
}
