//! In-memory catalog sink.
//!
//! Keeps records in a map and remembers every batch it received. Backs
//! `--dry-run` crawls and the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CatalogSink, SinkError, WriteOutcome};
use crate::domain::CatalogRecord;

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<String, CatalogRecord>,
    batches: Vec<Vec<String>>,
}

/// Sink that stores records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemoryState>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct records stored
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Look up a record by id
    pub async fn get(&self, id: &str) -> Option<CatalogRecord> {
        self.state.lock().await.records.get(id).cloned()
    }

    /// All stored ids, sorted
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().await.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of every batch received, in arrival order
    pub async fn batches(&self) -> Vec<Vec<String>> {
        self.state.lock().await.batches.clone()
    }
}

#[async_trait]
impl CatalogSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn bulk_write(&self, records: &[CatalogRecord]) -> Result<Vec<WriteOutcome>, SinkError> {
        let mut state = self.state.lock().await;
        state
            .batches
            .push(records.iter().map(|r| r.id.clone()).collect());

        let outcomes = records
            .iter()
            .map(|record| {
                if state.records.contains_key(&record.id) {
                    WriteOutcome::Conflict {
                        id: record.id.clone(),
                    }
                } else {
                    state.records.insert(record.id.clone(), record.clone());
                    WriteOutcome::Written {
                        id: record.id.clone(),
                    }
                }
            })
            .collect();

        Ok(outcomes)
    }
}
