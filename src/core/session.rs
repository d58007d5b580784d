//! State owned by a single crawl.

use std::sync::Arc;

use super::batcher::{BatchTotals, Batcher};
use super::error::CrawlError;
use super::visited::VisitedSet;
use crate::domain::{CatalogRecord, ContentHash};
use crate::log::LogSink;
use crate::store::{CatalogSink, SinkError, WriteReport};

/// Visited set and pending queue for one crawl invocation.
///
/// Created fresh at crawl start and dropped after the final flush, so
/// concurrent crawls never share buffers or dedup state.
pub struct CrawlSession {
    visited: VisitedSet,
    batcher: Batcher,
    log: Arc<dyn LogSink>,
}

impl CrawlSession {
    pub fn new(sink: Arc<dyn CatalogSink>, log: Arc<dyn LogSink>, max_batch_size: usize) -> Self {
        Self {
            visited: VisitedSet::new(),
            batcher: Batcher::new(sink, Arc::clone(&log), max_batch_size),
            log,
        }
    }

    pub fn log(&self) -> &dyn LogSink {
        self.log.as_ref()
    }

    /// Claim a hash for re-rooting; `true` for the first caller only
    pub fn mark_visited(&self, hash: &ContentHash) -> bool {
        self.visited.insert(hash)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub async fn enqueue(&self, record: CatalogRecord) -> Result<(), CrawlError> {
        self.batcher.enqueue(record).await
    }

    pub async fn flush(&self) -> Result<WriteReport, SinkError> {
        self.batcher.flush().await
    }

    pub async fn pending_len(&self) -> usize {
        self.batcher.pending_len().await
    }

    pub fn totals(&self) -> BatchTotals {
        self.batcher.totals()
    }
}
