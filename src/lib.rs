//! slurp - IPFS DAG crawler and cataloguer
//!
//! Walks a Merkle DAG from a root hash, classifies every directory as
//! content or container, and writes one catalog record per content file
//! and content directory to a persistent sink in bulk batches.
//!
//! # Architecture
//!
//! - Directories holding a `covers` entry, at least one file, or nothing at
//!   all are content. Below the root they are recorded under the path that
//!   reached them and then re-crawled as their own root, once per crawl.
//! - Everything else is a container and is only traversed.
//! - Records are buffered and written in bulk; conflicts on re-crawl are
//!   warnings, not failures.
//!
//! # Modules
//!
//! - `adapters`: Node fetchers (IPFS HTTP API, in-memory)
//! - `core`: Traversal, classification, dedup and batching
//! - `domain`: Data structures (ContentHash, DirEntry, CatalogRecord)
//! - `store`: Catalog sinks (SQLite, in-memory)
//! - `log`: Crawl narration sinks
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Crawl a DAG into the catalog
//! slurp crawl QmUCEx1poBu726HioY2SEsY3PjCwyGxP79SAiCrr56TRkM
//!
//! # Browse what was found
//! slurp list --kind dir
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod log;
pub mod store;

// Re-export main types at crate root for convenience
pub use adapters::{FetchError, IpfsClient, MemoryFetcher, NodeFetcher};
pub use core::{CrawlError, Crawler};
pub use domain::{CatalogRecord, ContentHash, CrawlSummary, DirEntry, EntryKind, MediaType, RecordKind};
pub use log::{LogHistory, LogSink, TracingLog};
pub use store::{CatalogSink, MemorySink, SinkError, SqliteCatalog, WriteOutcome};
