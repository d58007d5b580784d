//! Adapter interfaces for the content store.
//!
//! Adapters give the crawler a uniform way to list directory nodes and
//! fetch raw blocks, whatever the transport.

pub mod ipfs;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ContentHash, DirEntry};

// Re-export the concrete fetchers
pub use ipfs::IpfsClient;
pub use memory::MemoryFetcher;

/// Errors raised while talking to the content store
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request for {hash} failed: {source}")]
    Http {
        hash: ContentHash,
        #[source]
        source: reqwest::Error,
    },

    #[error("Content store returned {status} for {hash}: {message}")]
    Api {
        hash: ContentHash,
        status: u16,
        message: String,
    },

    #[error("Node not found: {0}")]
    NotFound(ContentHash),

    #[error("Malformed response for {hash}: {reason}")]
    Malformed { hash: ContentHash, reason: String },
}

/// Read access to a content-addressed DAG
#[async_trait]
pub trait NodeFetcher: Send + Sync {
    /// Human-readable fetcher name
    fn name(&self) -> &str;

    /// List the immediate children of a directory node, in link order
    async fn list(&self, hash: &ContentHash) -> Result<Vec<DirEntry>, FetchError>;

    /// Fetch the raw bytes of a block
    async fn get_block(&self, hash: &ContentHash) -> Result<Vec<u8>, FetchError>;
}
