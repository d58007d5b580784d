//! Core crawl logic.
//!
//! This module contains:
//! - Classify: Content vs. container directories
//! - VisitedSet: Crawl-scoped dedup of re-rooted hashes
//! - Batcher: Buffered bulk writes to the catalog sink
//! - CrawlTrigger: Idle/Crawling/Flushing guard
//! - Crawler: Main traversal engine

pub mod batcher;
pub mod classify;
pub mod crawler;
pub mod error;
pub mod session;
pub mod trigger;
pub mod visited;

// Re-export commonly used types
pub use batcher::{BatchTotals, Batcher, DEFAULT_MAX_BATCH_SIZE};
pub use classify::{classify_directory, DirectoryClass, COVERS_MARKER};
pub use crawler::{Crawler, DEFAULT_MAX_CONCURRENCY, LINK_MARKER};
pub use error::CrawlError;
pub use session::CrawlSession;
pub use trigger::{CrawlGuard, CrawlPhase, CrawlTrigger};
pub use visited::VisitedSet;
