//! Outcome of a single crawl.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::hash::ContentHash;

/// Counters and timing for one crawl invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    /// Unique identifier for this crawl
    pub crawl_id: Uuid,

    /// Root hash the crawl started from
    pub root: ContentHash,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Records handed to the batcher
    pub enqueued: u64,

    /// Records the sink accepted
    pub written: u64,

    /// Records rejected as duplicate ids
    pub conflicts: u64,

    /// Records rejected for any other reason
    pub failed: u64,

    /// Number of bulk writes issued
    pub flushes: u64,

    /// Branch failures absorbed during traversal
    pub branch_errors: u64,
}

impl CrawlSummary {
    /// Start a new summary for a crawl of `root`
    pub fn new(root: ContentHash) -> Self {
        Self {
            crawl_id: Uuid::new_v4(),
            root,
            started_at: Utc::now(),
            finished_at: None,
            enqueued: 0,
            written: 0,
            conflicts: 0,
            failed: 0,
            flushes: 0,
            branch_errors: 0,
        }
    }

    /// Mark the crawl as finished now
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration in milliseconds (if finished)
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// True when every enqueued record is accounted for by a sink outcome
    pub fn is_settled(&self) -> bool {
        self.written + self.conflicts + self.failed == self.enqueued
    }
}
