//! SQLite-backed catalog.
//!
//! Records live in a single `records` table keyed by their id; the primary
//! key gives duplicate ids conflict semantics. Finished crawls are logged to
//! a `crawls` table so runs can be inspected later.
//!
//! `rusqlite` is blocking, so every call hops onto the blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use super::{CatalogSink, SinkError, WriteOutcome};
use crate::domain::{CatalogRecord, ContentHash, CrawlSummary, MediaType, PathSegments, RecordKind};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    id           TEXT PRIMARY KEY,
    kind         TEXT NOT NULL,
    path         TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    mime_type    TEXT,
    indexed_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_content_hash ON records (content_hash);

CREATE TABLE IF NOT EXISTS crawls (
    crawl_id      TEXT PRIMARY KEY,
    root          TEXT NOT NULL,
    started_at    TEXT NOT NULL,
    finished_at   TEXT,
    enqueued      INTEGER NOT NULL,
    written       INTEGER NOT NULL,
    conflicts     INTEGER NOT NULL,
    failed        INTEGER NOT NULL,
    flushes       INTEGER NOT NULL,
    branch_errors INTEGER NOT NULL
);
";

/// Filter for listing catalog records
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Only ids starting with this prefix
    pub prefix: Option<String>,

    /// Only records of this kind
    pub kind: Option<RecordKind>,

    /// Maximum number of records (0 = no limit)
    pub limit: usize,
}

/// Catalog stored in a SQLite database
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
    /// Database file (None for in-memory catalogs)
    path: Option<PathBuf>,
}

/// Raw `records` row before decoding
struct RecordRow {
    id: String,
    kind: String,
    path: String,
    content_hash: String,
    mime_type: Option<String>,
}

impl RecordRow {
    fn into_record(self) -> Result<CatalogRecord, SinkError> {
        let kind = match self.kind.as_str() {
            "file" => RecordKind::File,
            "dir" => RecordKind::Directory,
            other => {
                return Err(SinkError::Corrupt(format!(
                    "record {} has unknown kind {}",
                    self.id, other
                )))
            }
        };
        let segments: Vec<String> = serde_json::from_str(&self.path)?;

        Ok(CatalogRecord {
            id: self.id,
            kind,
            path: PathSegments::from(segments),
            content_hash: ContentHash::new(self.content_hash),
            mime_type: self.mime_type.as_deref().map(MediaType::from_mime),
        })
    }
}

impl SqliteCatalog {
    /// Open (or create) a catalog database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, SinkError> {
            let conn = Connection::open(&open_path)?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open a throwaway in-memory catalog
    pub fn open_in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file backing this catalog
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T, SinkError>
    where
        F: FnOnce(&mut Connection) -> Result<T, SinkError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| SinkError::Poisoned)?;
            f(&mut *guard)
        })
        .await?
    }

    /// Look up a record by id
    pub async fn get(&self, id: &str) -> Result<Option<CatalogRecord>, SinkError> {
        let id = id.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, kind, path, content_hash, mime_type FROM records WHERE id = ?1",
                        params![id],
                        read_record_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(RecordRow::into_record).transpose()
    }

    /// List records matching `query`, ordered by id
    pub async fn list(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>, SinkError> {
        let query = query.clone();
        let rows = self
            .with_conn(move |conn| {
                let pattern = format!("{}%", escape_like(query.prefix.as_deref().unwrap_or("")));
                let kind = query.kind.map(|k| k.as_str().to_string());
                let limit = if query.limit == 0 { -1 } else { query.limit as i64 };

                let mut stmt = conn.prepare(
                    "SELECT id, kind, path, content_hash, mime_type FROM records
                     WHERE id LIKE ?1 ESCAPE '\\' AND (?2 IS NULL OR kind = ?2)
                     ORDER BY id LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(params![pattern, kind, limit], read_record_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    /// Total number of records
    pub async fn count(&self) -> Result<u64, SinkError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    /// Persist the summary of a finished crawl
    pub async fn record_crawl(&self, summary: &CrawlSummary) -> Result<(), SinkError> {
        let summary = summary.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO crawls
                 (crawl_id, root, started_at, finished_at, enqueued, written, conflicts, failed, flushes, branch_errors)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    summary.crawl_id.to_string(),
                    summary.root.as_str(),
                    summary.started_at.to_rfc3339(),
                    summary.finished_at.map(|t| t.to_rfc3339()),
                    summary.enqueued as i64,
                    summary.written as i64,
                    summary.conflicts as i64,
                    summary.failed as i64,
                    summary.flushes as i64,
                    summary.branch_errors as i64,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Most recent crawls, newest first
    pub async fn recent_crawls(&self, limit: usize) -> Result<Vec<CrawlSummary>, SinkError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT crawl_id, root, started_at, finished_at, enqueued, written, conflicts, failed, flushes, branch_errors
                 FROM crawls ORDER BY started_at DESC LIMIT ?1",
            )?;

            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        [
                            row.get::<_, i64>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, i64>(6)?,
                            row.get::<_, i64>(7)?,
                            row.get::<_, i64>(8)?,
                            row.get::<_, i64>(9)?,
                        ],
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(crawl_id, root, started_at, finished_at, counts)| -> Result<CrawlSummary, SinkError> {
                    Ok(CrawlSummary {
                        crawl_id: Uuid::parse_str(&crawl_id)
                            .map_err(|e| SinkError::Corrupt(format!("crawl id {}: {}", crawl_id, e)))?,
                        root: ContentHash::new(root),
                        started_at: parse_timestamp(&started_at)?,
                        finished_at: finished_at.as_deref().map(parse_timestamp).transpose()?,
                        enqueued: counts[0] as u64,
                        written: counts[1] as u64,
                        conflicts: counts[2] as u64,
                        failed: counts[3] as u64,
                        flushes: counts[4] as u64,
                        branch_errors: counts[5] as u64,
                    })
                })
                .collect()
        })
        .await
    }
}

#[async_trait]
impl CatalogSink for SqliteCatalog {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn bulk_write(&self, records: &[CatalogRecord]) -> Result<Vec<WriteOutcome>, SinkError> {
        let records = records.to_vec();
        self.with_conn(move |conn| {
            let indexed_at = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            let mut outcomes = Vec::with_capacity(records.len());

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO records (id, kind, path, content_hash, mime_type, indexed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;

                for record in &records {
                    let path = serde_json::to_string(&record.path)?;
                    let result = stmt.execute(params![
                        record.id,
                        record.kind.as_str(),
                        path,
                        record.content_hash.as_str(),
                        record.mime_type.map(|m| m.as_str()),
                        indexed_at,
                    ]);

                    let id = record.id.clone();
                    outcomes.push(match result {
                        Ok(_) => WriteOutcome::Written { id },
                        Err(rusqlite::Error::SqliteFailure(err, _))
                            if err.code == ErrorCode::ConstraintViolation =>
                        {
                            WriteOutcome::Conflict { id }
                        }
                        Err(e) => WriteOutcome::Failed {
                            id,
                            reason: e.to_string(),
                        },
                    });
                }
            }

            tx.commit()?;
            Ok(outcomes)
        })
        .await
    }
}

fn read_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        path: row.get(2)?,
        content_hash: row.get(3)?,
        mime_type: row.get(4)?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, SinkError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SinkError::Corrupt(format!("timestamp {}: {}", value, e)))
}

/// Escape LIKE wildcards so prefixes match literally
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(segments: &[&str], hash: &str) -> CatalogRecord {
        let path = PathSegments::from(segments.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        let name = segments.last().copied().unwrap_or_default();
        CatalogRecord::file(path, ContentHash::from(hash), crate::domain::classify(name))
    }

    #[tokio::test]
    async fn test_bulk_write_and_get() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let record = file(&["QmRoot", "a", "b.jpg"], "QmB");

        let outcomes = catalog.bulk_write(&[record.clone()]).await.unwrap();
        assert_eq!(
            outcomes,
            vec![WriteOutcome::Written {
                id: "QmRoot/a/b.jpg".to_string()
            }]
        );

        let stored = catalog.get("QmRoot/a/b.jpg").await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(catalog.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_reports_conflict() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let record = file(&["QmRoot", "x.gif"], "QmX");

        catalog.bulk_write(&[record.clone()]).await.unwrap();
        let outcomes = catalog
            .bulk_write(&[record, file(&["QmRoot", "y.gif"], "QmY")])
            .await
            .unwrap();

        assert!(outcomes[0].is_conflict());
        assert!(matches!(outcomes[1], WriteOutcome::Written { .. }));
        assert_eq!(catalog.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_with_prefix_and_kind() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let dir = CatalogRecord::directory(
            PathSegments::from(vec!["QmRoot".to_string(), "books".to_string()]),
            ContentHash::from("QmBooks"),
        );
        catalog
            .bulk_write(&[
                dir,
                file(&["QmRoot", "books", "a.epub"], "QmA"),
                file(&["QmOther", "c.jpg"], "QmC"),
            ])
            .await
            .unwrap();

        let under_root = catalog
            .list(&CatalogQuery {
                prefix: Some("QmRoot/".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(under_root.len(), 2);

        let dirs = catalog
            .list(&CatalogQuery {
                kind: Some(RecordKind::Directory),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].id, "QmRoot/books/");

        let limited = catalog
            .list(&CatalogQuery {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_prefix_wildcards_match_literally() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog
            .bulk_write(&[file(&["Qm_a", "x.jpg"], "QmX"), file(&["QmZa", "y.jpg"], "QmY")])
            .await
            .unwrap();

        let matched = catalog
            .list(&CatalogQuery {
                prefix: Some("Qm_a".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "Qm_a/x.jpg");
    }

    #[tokio::test]
    async fn test_crawl_history() {
        let temp = TempDir::new().unwrap();
        let catalog = SqliteCatalog::open(temp.path().join("nested").join("catalog.db"))
            .await
            .unwrap();

        let mut summary = CrawlSummary::new(ContentHash::from("QmRoot"));
        summary.enqueued = 3;
        summary.written = 2;
        summary.conflicts = 1;
        summary.flushes = 1;
        summary.finish();
        catalog.record_crawl(&summary).await.unwrap();

        let crawls = catalog.recent_crawls(10).await.unwrap();
        assert_eq!(crawls.len(), 1);
        assert_eq!(crawls[0].crawl_id, summary.crawl_id);
        assert_eq!(crawls[0].root, summary.root);
        assert_eq!(crawls[0].conflicts, 1);
        assert!(crawls[0].finished_at.is_some());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b%c\\"), "a\\_b\\%c\\\\");
        assert_eq!(escape_like("QmRoot/"), "QmRoot/");
    }
}
