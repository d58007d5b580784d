//! Crawl error taxonomy.

use thiserror::Error;

use crate::adapters::FetchError;
use crate::domain::ContentHash;
use crate::store::SinkError;

/// Errors raised while crawling.
///
/// Only the fatal variants surface from [`crate::core::Crawler::crawl`];
/// everything else is absorbed at the nearest fan-out point and logged.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Conflict: {id} is already cataloged")]
    Conflict { id: String },

    #[error("Unknown: \"{path}\":")]
    UnknownEntry { path: String },

    #[error("Bulk write failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Cannot list root {hash}: {source}")]
    RootListing {
        hash: ContentHash,
        #[source]
        source: FetchError,
    },

    #[error("Final flush failed: {source}")]
    FinalFlush {
        #[source]
        source: SinkError,
    },

    #[error("A crawl is already in progress")]
    Busy,
}

impl CrawlError {
    /// Whether this error ends the crawl
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootListing { .. } | Self::FinalFlush { .. } | Self::Busy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(CrawlError::Busy.is_fatal());
        assert!(CrawlError::RootListing {
            hash: ContentHash::from("QmRoot"),
            source: FetchError::NotFound(ContentHash::from("QmRoot")),
        }
        .is_fatal());

        assert!(!CrawlError::Conflict { id: "a".into() }.is_fatal());
        assert!(!CrawlError::UnknownEntry { path: "a/b".into() }.is_fatal());
        assert!(!CrawlError::Fetch(FetchError::NotFound(ContentHash::from("QmX"))).is_fatal());
    }

    #[test]
    fn test_messages() {
        let err = CrawlError::UnknownEntry {
            path: "QmRoot/odd".into(),
        };
        assert_eq!(err.to_string(), "Unknown: \"QmRoot/odd\":");
    }
}
