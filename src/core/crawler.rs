//! DAG traversal and cataloging.
//!
//! The crawler walks the DAG from a root hash with an explicit work list of
//! tasks driven through a [`JoinSet`]. Each directory task lists its node,
//! classifies it, emits records, and returns the follow-up tasks for its
//! children. A failing task is logged and counted; its siblings keep going.
//!
//! Content directories found below the root are cataloged under the path
//! they were found at, then re-rooted: their children are enumerated under
//! `[hash, ...]` instead of the nested path, once per crawl per hash.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use super::classify::{classify_directory, DirectoryClass};
use super::error::CrawlError;
use super::session::CrawlSession;
use super::trigger::CrawlTrigger;
use crate::adapters::NodeFetcher;
use crate::domain::{
    classify, CatalogRecord, ContentHash, CrawlSummary, DirEntry, EntryKind, PathSegments,
};
use crate::log::LogSink;
use crate::store::CatalogSink;

/// First byte of a block holding a link
pub const LINK_MARKER: u8 = 10;

/// Offset of the link target inside a link block
const LINK_TARGET_OFFSET: usize = 6;

/// Default number of tasks in flight
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Directory to list and classify
#[derive(Debug, Clone)]
struct DirectoryTask {
    hash: ContentHash,
    path: PathSegments,
    /// Set once a branch has been re-rooted; inherited by descendants
    split: bool,
    /// Listing already fetched for this hash
    listing: Option<Vec<DirEntry>>,
}

/// Unit of work on the crawl backlog
#[derive(Debug, Clone)]
enum Task {
    Directory(DirectoryTask),
    Block { hash: ContentHash, path: PathSegments },
}

impl Task {
    /// Human path used in failure lines
    fn label(&self) -> String {
        match self {
            Task::Directory(dir) if dir.path.is_empty() => dir.hash.to_string(),
            Task::Directory(dir) => format!("{}/", dir.path),
            Task::Block { path, .. } => path.join(),
        }
    }
}

/// Shared handles cloned into every task
#[derive(Clone)]
struct TaskContext {
    fetcher: Arc<dyn NodeFetcher>,
    session: Arc<CrawlSession>,
}

impl TaskContext {
    async fn process(self, task: Task) -> Result<Vec<Task>, CrawlError> {
        match task {
            Task::Directory(dir) => self.visit_directory(dir).await,
            Task::Block { hash, path } => {
                self.sniff_block(&hash, &path).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn visit_directory(&self, task: DirectoryTask) -> Result<Vec<Task>, CrawlError> {
        let DirectoryTask {
            hash,
            mut path,
            split,
            listing,
        } = task;

        let entries = match listing {
            Some(entries) => entries,
            None => self.fetcher.list(&hash).await?,
        };

        // the root is addressed by its own hash
        if path.is_empty() {
            path.push(hash.as_str());
        }

        let class = classify_directory(&entries);
        if !split && class == DirectoryClass::Content && path.len() > 1 {
            return Ok(self.split(hash, path, entries).await);
        }

        Ok(self.enumerate(&path, split, entries).await)
    }

    /// Catalog a nested content directory and schedule its re-rooted pass
    async fn split(&self, hash: ContentHash, path: PathSegments, entries: Vec<DirEntry>) -> Vec<Task> {
        let record = CatalogRecord::directory(path, hash.clone());
        let id = record.id.clone();
        if let Err(e) = self.session.enqueue(record).await {
            self.session
                .log()
                .error(&format!("Failed to queue \"{}\": {}", id, e));
        }

        if !self.session.mark_visited(&hash) {
            debug!(%hash, "Already re-rooted");
            return Vec::new();
        }

        vec![Task::Directory(DirectoryTask {
            hash,
            path: PathSegments::new(),
            split: true,
            listing: Some(entries),
        })]
    }

    /// Handle each child under `path`, returning tasks for those needing I/O
    async fn enumerate(&self, path: &PathSegments, split: bool, entries: Vec<DirEntry>) -> Vec<Task> {
        let log = self.session.log();
        let mut tasks = Vec::new();

        for entry in entries {
            let name = entry.segment();
            let child_path = path.child(name.as_str());

            match entry.kind {
                EntryKind::Directory => {
                    log.info(&format!("Dir: \"{}/\": Recursing", child_path));
                    tasks.push(Task::Directory(DirectoryTask {
                        hash: entry.hash,
                        path: child_path,
                        split,
                        listing: None,
                    }));
                }
                EntryKind::File => {
                    log.info(&format!("Adding File: {}", name));
                    let record = CatalogRecord::file(child_path, entry.hash, classify(&name));
                    let id = record.id.clone();
                    // conflicts are reported per record by the batcher
                    if let Err(e) = self.session.enqueue(record).await {
                        log.error(&format!("Failed to queue \"{}\": {}", id, e));
                    }
                }
                EntryKind::Other => {
                    tasks.push(Task::Block {
                        hash: entry.hash,
                        path: child_path,
                    });
                }
            }
        }

        tasks
    }

    /// Fetch an unrecognized entry's block and report what it is
    async fn sniff_block(&self, hash: &ContentHash, path: &PathSegments) -> Result<(), CrawlError> {
        let data = self.fetcher.get_block(hash).await?;
        let log = self.session.log();

        if data.first() == Some(&LINK_MARKER) {
            let target = data.get(LINK_TARGET_OFFSET..).unwrap_or_default();
            log.info(&format!(
                "ToDo: Link: \"{}\": {}",
                path,
                String::from_utf8_lossy(target)
            ));
        } else {
            let unknown = CrawlError::UnknownEntry {
                path: path.join(),
            };
            log.error(&unknown.to_string());
        }

        Ok(())
    }
}

/// Crawls a DAG into a catalog sink
pub struct Crawler {
    fetcher: Arc<dyn NodeFetcher>,
    sink: Arc<dyn CatalogSink>,
    log: Arc<dyn LogSink>,
    max_concurrency: usize,
    trigger: CrawlTrigger,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn NodeFetcher>,
        sink: Arc<dyn CatalogSink>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            log,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            trigger: CrawlTrigger::new(),
        }
    }

    /// Limit the number of tasks in flight (at least one)
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Trigger guarding this crawler against concurrent crawls
    pub fn trigger(&self) -> &CrawlTrigger {
        &self.trigger
    }

    /// Crawl the DAG under `root` and write every record to the sink.
    ///
    /// `max_batch_size` is the flush threshold; 0 writes everything in one
    /// batch at the end. Fails only if the crawler is busy, the root cannot
    /// be listed, or the final flush fails.
    #[instrument(skip(self, root), fields(root = %root))]
    pub async fn crawl(&self, root: &ContentHash, max_batch_size: usize) -> Result<CrawlSummary, CrawlError> {
        let guard = self.trigger.try_begin()?;
        let mut summary = CrawlSummary::new(root.clone());
        info!(crawl_id = %summary.crawl_id, max_batch_size, "Starting crawl");
        self.log.info("Queuing…");

        let listing = self.fetcher.list(root).await.map_err(|source| {
            let err = CrawlError::RootListing {
                hash: root.clone(),
                source,
            };
            self.log.error(&err.to_string());
            err
        })?;

        let session = Arc::new(CrawlSession::new(
            Arc::clone(&self.sink),
            Arc::clone(&self.log),
            max_batch_size,
        ));
        let context = TaskContext {
            fetcher: Arc::clone(&self.fetcher),
            session: Arc::clone(&session),
        };

        let root_task = Task::Directory(DirectoryTask {
            hash: root.clone(),
            path: PathSegments::new(),
            split: false,
            listing: Some(listing),
        });
        summary.branch_errors = self.drive(context, root_task).await;

        guard.flushing();
        self.log
            .info(&format!("Queued {}, Writing…", session.pending_len().await));
        session.flush().await.map_err(|source| {
            let err = CrawlError::FinalFlush { source };
            self.log.error(&err.to_string());
            err
        })?;
        self.log.info("Done");

        let totals = session.totals();
        summary.enqueued = totals.enqueued;
        summary.written = totals.written;
        summary.conflicts = totals.conflicts;
        summary.failed = totals.failed;
        summary.flushes = totals.flushes;
        summary.finish();

        info!(
            crawl_id = %summary.crawl_id,
            enqueued = summary.enqueued,
            written = summary.written,
            conflicts = summary.conflicts,
            rerooted = session.visited_count(),
            branch_errors = summary.branch_errors,
            "Crawl complete"
        );

        Ok(summary)
    }

    /// Run the backlog to completion, returning the number of failed tasks
    async fn drive(&self, context: TaskContext, root: Task) -> u64 {
        let mut backlog = VecDeque::from([root]);
        let mut in_flight = JoinSet::new();
        let mut branch_errors = 0;

        loop {
            while in_flight.len() < self.max_concurrency {
                let Some(task) = backlog.pop_front() else {
                    break;
                };
                let context = context.clone();
                in_flight.spawn(async move {
                    let label = task.label();
                    (label, context.process(task).await)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((_, Ok(children))) => backlog.extend(children),
                Ok((label, Err(e))) => {
                    branch_errors += 1;
                    self.log.error(&format!("Failed: \"{}\": {}", label, e));
                }
                Err(e) => {
                    branch_errors += 1;
                    self.log.error(&format!("Crawl task aborted: {}", e));
                }
            }
        }

        branch_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryFetcher;
    use crate::log::LogHistory;
    use crate::store::MemorySink;

    fn crawler(fetcher: MemoryFetcher) -> (Crawler, Arc<MemorySink>, Arc<LogHistory>) {
        let sink = Arc::new(MemorySink::new());
        let log = Arc::new(LogHistory::new(1000));
        let crawler = Crawler::new(Arc::new(fetcher), sink.clone(), log.clone());
        (crawler, sink, log)
    }

    #[test]
    fn test_task_labels() {
        let dir = Task::Directory(DirectoryTask {
            hash: ContentHash::from("QmA"),
            path: PathSegments::new(),
            split: true,
            listing: None,
        });
        assert_eq!(dir.label(), "QmA");

        let block = Task::Block {
            hash: ContentHash::from("QmB"),
            path: PathSegments::root(&ContentHash::from("QmRoot")).child("b"),
        };
        assert_eq!(block.label(), "QmRoot/b");
    }

    #[tokio::test]
    async fn test_root_files_are_cataloged_without_dir_record() {
        let fetcher = MemoryFetcher::new().with_dir(
            "QmRoot",
            vec![DirEntry::file("a.jpg", "QmA"), DirEntry::file("b.svg", "QmB")],
        );
        let (crawler, sink, _log) = crawler(fetcher);

        let summary = crawler.crawl(&ContentHash::from("QmRoot"), 0).await.unwrap();

        assert_eq!(sink.ids().await, vec!["QmRoot/a.jpg", "QmRoot/b.svg"]);
        assert_eq!(summary.enqueued, 2);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.flushes, 1);
        assert!(crawler.trigger().is_enabled());
    }

    #[tokio::test]
    async fn test_link_block_is_logged() {
        let fetcher = MemoryFetcher::new()
            .with_dir("QmRoot", vec![DirEntry::other("shortcut", "QmLink")])
            .with_block("QmLink", b"\x0a\x04\x08\x04\x12\x00target".to_vec());
        let (crawler, sink, log) = crawler(fetcher);

        crawler.crawl(&ContentHash::from("QmRoot"), 0).await.unwrap();

        assert!(sink.is_empty().await);
        assert!(log.contains("ToDo: Link: \"QmRoot/shortcut\": target"));
    }

    #[tokio::test]
    async fn test_unknown_block_is_logged() {
        let fetcher = MemoryFetcher::new()
            .with_dir("QmRoot", vec![DirEntry::other("odd", "QmOdd")])
            .with_block("QmOdd", vec![0x12, 0x00]);
        let (crawler, _sink, log) = crawler(fetcher);

        let summary = crawler.crawl(&ContentHash::from("QmRoot"), 0).await.unwrap();

        assert_eq!(summary.branch_errors, 0);
        assert!(log.contains("Unknown: \"QmRoot/odd\":"));
    }
}
