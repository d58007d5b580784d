//! Buffered bulk writes of catalog records.
//!
//! Records accumulate in a pending buffer and are written to the sink in one
//! bulk call when the buffer reaches the batch size, or when the crawl ends.
//! The buffer is swapped out under the lock before the write is issued, so
//! records enqueued while a write is in flight start a fresh buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::error::CrawlError;
use crate::domain::CatalogRecord;
use crate::log::LogSink;
use crate::store::{CatalogSink, SinkError, WriteOutcome, WriteReport};

/// Default number of records per bulk write
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// Running totals for one batcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTotals {
    pub enqueued: u64,
    pub written: u64,
    pub conflicts: u64,
    pub failed: u64,
    pub flushes: u64,
}

/// Pending-record buffer with bulk flushing
pub struct Batcher {
    sink: Arc<dyn CatalogSink>,
    log: Arc<dyn LogSink>,
    /// Flush threshold (0 = only flush explicitly)
    max_batch_size: usize,
    pending: Mutex<Vec<CatalogRecord>>,
    enqueued: AtomicU64,
    written: AtomicU64,
    conflicts: AtomicU64,
    failed: AtomicU64,
    flushes: AtomicU64,
}

impl Batcher {
    pub fn new(sink: Arc<dyn CatalogSink>, log: Arc<dyn LogSink>, max_batch_size: usize) -> Self {
        Self {
            sink,
            log,
            max_batch_size,
            pending: Mutex::new(Vec::new()),
            enqueued: AtomicU64::new(0),
            written: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    /// Total records ever enqueued
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::SeqCst)
    }

    /// Records currently buffered
    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Add a record, flushing if the buffer is full.
    ///
    /// Returns an error only if a triggered flush failed as a whole.
    pub async fn enqueue(&self, record: CatalogRecord) -> Result<(), CrawlError> {
        let full_batch = {
            let mut pending = self.pending.lock().await;
            let count = self.enqueued.fetch_add(1, Ordering::SeqCst) + 1;
            self.log.info(&format!(
                "Queued {} ({}): {}: {}",
                count,
                pending.len() + 1,
                record.kind,
                record.id
            ));
            pending.push(record);

            if self.max_batch_size > 0 && pending.len() >= self.max_batch_size {
                Some(std::mem::take(&mut *pending))
            } else {
                None
            }
        };

        if let Some(batch) = full_batch {
            self.log.info("Flushing queue");
            self.write(batch).await?;
        }

        Ok(())
    }

    /// Write out whatever is buffered
    pub async fn flush(&self) -> Result<WriteReport, SinkError> {
        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return Ok(WriteReport::default());
        }
        self.write(batch).await
    }

    /// Snapshot of the running totals
    pub fn totals(&self) -> BatchTotals {
        BatchTotals {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            written: self.written.load(Ordering::SeqCst),
            conflicts: self.conflicts.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            flushes: self.flushes.load(Ordering::SeqCst),
        }
    }

    async fn write(&self, batch: Vec<CatalogRecord>) -> Result<WriteReport, SinkError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        debug!(size = batch.len(), sink = self.sink.name(), "Bulk write");

        let outcomes = match self.sink.bulk_write(&batch).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                // the whole batch is lost
                self.failed.fetch_add(batch.len() as u64, Ordering::SeqCst);
                self.log
                    .error(&format!("Bulk write of {} records failed: {}", batch.len(), e));
                return Err(e);
            }
        };

        for outcome in &outcomes {
            match outcome {
                WriteOutcome::Written { .. } => {}
                WriteOutcome::Conflict { id } => {
                    let conflict = CrawlError::Conflict { id: id.clone() };
                    self.log.warn(&conflict.to_string());
                }
                WriteOutcome::Failed { id, reason } => {
                    self.log.error(&format!("Failed to write {}: {}", id, reason));
                }
            }
        }

        let report = WriteReport::from_outcomes(&outcomes);
        self.written.fetch_add(report.written, Ordering::SeqCst);
        self.conflicts.fetch_add(report.conflicts, Ordering::SeqCst);
        self.failed.fetch_add(report.failed, Ordering::SeqCst);

        Ok(report)
    }
}
