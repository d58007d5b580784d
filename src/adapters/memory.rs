//! In-memory DAG fetcher.
//!
//! Serves listings and blocks from maps built up front. Used for fixtures
//! and tests; hashes can be marked as failing to exercise error paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{FetchError, NodeFetcher};
use crate::domain::{ContentHash, DirEntry};

/// Fetcher backed by in-memory maps
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    directories: HashMap<ContentHash, Vec<DirEntry>>,
    blocks: HashMap<ContentHash, Vec<u8>>,
    failing: HashSet<ContentHash>,
    list_calls: DashMap<ContentHash, usize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory node with its children
    pub fn with_dir(mut self, hash: impl Into<ContentHash>, entries: Vec<DirEntry>) -> Self {
        self.directories.insert(hash.into(), entries);
        self
    }

    /// Register a raw block
    pub fn with_block(mut self, hash: impl Into<ContentHash>, data: impl Into<Vec<u8>>) -> Self {
        self.blocks.insert(hash.into(), data.into());
        self
    }

    /// Make every request for `hash` fail
    pub fn failing(mut self, hash: impl Into<ContentHash>) -> Self {
        self.failing.insert(hash.into());
        self
    }

    /// Number of times `hash` has been listed
    pub fn list_count(&self, hash: &ContentHash) -> usize {
        self.list_calls.get(hash).map(|count| *count).unwrap_or(0)
    }

    fn check_failing(&self, hash: &ContentHash) -> Result<(), FetchError> {
        if self.failing.contains(hash) {
            return Err(FetchError::Api {
                hash: hash.clone(),
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NodeFetcher for MemoryFetcher {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, hash: &ContentHash) -> Result<Vec<DirEntry>, FetchError> {
        *self.list_calls.entry(hash.clone()).or_insert(0) += 1;
        self.check_failing(hash)?;

        self.directories
            .get(hash)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(hash.clone()))
    }

    async fn get_block(&self, hash: &ContentHash) -> Result<Vec<u8>, FetchError> {
        self.check_failing(hash)?;

        self.blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(hash.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_and_count() {
        let fetcher = MemoryFetcher::new().with_dir("QmRoot", vec![DirEntry::file("a.jpg", "QmA")]);
        let root = ContentHash::from("QmRoot");

        let entries = fetcher.list(&root).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(fetcher.list_count(&root), 1);
    }

    #[tokio::test]
    async fn test_missing_and_failing() {
        let fetcher = MemoryFetcher::new()
            .with_dir("QmBroken", vec![])
            .failing("QmBroken");

        assert!(matches!(
            fetcher.list(&ContentHash::from("QmMissing")).await,
            Err(FetchError::NotFound(_))
        ));
        assert!(matches!(
            fetcher.list(&ContentHash::from("QmBroken")).await,
            Err(FetchError::Api { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_block() {
        let fetcher = MemoryFetcher::new().with_block("QmBlock", vec![10, 1, 2]);
        let data = fetcher.get_block(&ContentHash::from("QmBlock")).await.unwrap();
        assert_eq!(data, vec![10, 1, 2]);
    }
}
