//! Persistent catalog sinks.
//!
//! A sink accepts bulk writes of catalog records keyed by id. Writing an id
//! that already exists is reported per record as a conflict, never as a
//! failure of the whole batch.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.slurp/
//! └── catalog.db                # SQLite: records + crawl history
//! ```

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::CatalogRecord;

pub use memory::MemorySink;
pub use sqlite::{CatalogQuery, SqliteCatalog};

/// Errors that fail a bulk write as a whole
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt catalog data: {0}")]
    Corrupt(String),

    #[error("Catalog connection poisoned by an earlier panic")]
    Poisoned,

    #[error("Catalog worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of writing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Record stored
    Written { id: String },

    /// A record with this id already exists
    Conflict { id: String },

    /// Record rejected for another reason
    Failed { id: String, reason: String },
}

impl WriteOutcome {
    /// Id of the record this outcome refers to
    pub fn id(&self) -> &str {
        match self {
            Self::Written { id } | Self::Conflict { id } | Self::Failed { id, .. } => id,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Tally of outcomes for one bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: u64,
    pub conflicts: u64,
    pub failed: u64,
}

impl WriteReport {
    /// Count outcomes
    pub fn from_outcomes(outcomes: &[WriteOutcome]) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                WriteOutcome::Written { .. } => report.written += 1,
                WriteOutcome::Conflict { .. } => report.conflicts += 1,
                WriteOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report
    }

    pub fn total(&self) -> u64 {
        self.written + self.conflicts + self.failed
    }
}

/// Bulk-write destination for catalog records
#[async_trait]
pub trait CatalogSink: Send + Sync {
    /// Human-readable sink name
    fn name(&self) -> &str;

    /// Write a batch, returning one outcome per record in input order
    async fn bulk_write(&self, records: &[CatalogRecord]) -> Result<Vec<WriteOutcome>, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_report_tally() {
        let outcomes = vec![
            WriteOutcome::Written { id: "a".into() },
            WriteOutcome::Conflict { id: "b".into() },
            WriteOutcome::Written { id: "c".into() },
            WriteOutcome::Failed {
                id: "d".into(),
                reason: "too large".into(),
            },
        ];

        let report = WriteReport::from_outcomes(&outcomes);
        assert_eq!(report.written, 2);
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 4);
        assert_eq!(outcomes[1].id(), "b");
        assert!(outcomes[1].is_conflict());
    }
}
