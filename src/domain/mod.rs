//! Domain types for the crawler.
//!
//! This module contains the core data structures:
//! - ContentHash: Names a node in the DAG
//! - DirEntry: A child link returned by a directory listing
//! - CatalogRecord: The unit written to the catalog
//! - CrawlSummary: Outcome of one crawl

pub mod entry;
pub mod hash;
pub mod mime;
pub mod record;
pub mod summary;

// Re-export commonly used types
pub use entry::{DirEntry, EntryKind};
pub use hash::ContentHash;
pub use mime::{classify, MediaType};
pub use record::{CatalogRecord, PathSegments, RecordKind, PATH_SEPARATOR};
pub use summary::CrawlSummary;
