//! Command-line interface for slurp.
//!
//! Provides commands for crawling a DAG into the catalog, browsing
//! catalog records, and inspecting past crawls.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use crate::adapters::IpfsClient;
use crate::config;
use crate::core::Crawler;
use crate::domain::{CatalogRecord, ContentHash, CrawlSummary, RecordKind};
use crate::log::LogHistory;
use crate::store::{CatalogQuery, CatalogSink, MemorySink, SqliteCatalog};

/// slurp - Crawl IPFS DAGs into a searchable catalog
#[derive(Parser, Debug)]
#[command(name = "slurp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a DAG and write its records to the catalog
    Crawl {
        /// Root hash (defaults to the configured root)
        hash: Option<String>,

        /// Records per bulk write (0 = one write at the end)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// IPFS HTTP API address
        #[arg(long, env = "SLURP_API_URL")]
        api: Option<String>,

        /// Maximum node fetches in flight
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Collect records in memory instead of writing the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// List catalog records
    List {
        /// Only ids starting with this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Only records of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Maximum number of records to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show one catalog record
    Show {
        /// Record id (e.g. QmRoot/photos/a.jpg)
        id: String,
    },

    /// List recent crawls
    History {
        /// Maximum number of crawls to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Record kind for CLI (maps to RecordKind)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// Content files
    File,

    /// Content directories
    Dir,
}

impl From<KindArg> for RecordKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::File => RecordKind::File,
            KindArg::Dir => RecordKind::Directory,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Crawl {
                hash,
                batch_size,
                api,
                concurrency,
                dry_run,
            } => run_crawl(hash, batch_size, api, concurrency, dry_run).await,
            Commands::List {
                prefix,
                kind,
                limit,
            } => list_records(prefix, kind, limit).await,
            Commands::Show { id } => show_record(&id).await,
            Commands::History { limit } => show_history(limit).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Open the configured catalog database
async fn open_catalog() -> Result<SqliteCatalog> {
    let path = config::database_path()?;
    SqliteCatalog::open(&path)
        .await
        .with_context(|| format!("Failed to open catalog: {}", path.display()))
}

/// Crawl a DAG into the catalog
async fn run_crawl(
    hash: Option<String>,
    batch_size: Option<usize>,
    api: Option<String>,
    concurrency: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let cfg = config::config()?;

    let root: ContentHash = match hash {
        Some(h) => h.parse()?,
        None => cfg.crawl.default_root.clone(),
    };
    let api_url = api.unwrap_or_else(|| cfg.ipfs.api_url.clone());
    let batch_size = batch_size.unwrap_or(cfg.crawl.max_batch_size);
    let concurrency = concurrency.unwrap_or(cfg.crawl.max_concurrency);

    let fetcher = Arc::new(IpfsClient::with_timeout(&api_url, cfg.ipfs.timeout())?);
    let history = Arc::new(LogHistory::new(cfg.crawl.log_history));

    let catalog = if dry_run {
        None
    } else {
        Some(Arc::new(open_catalog().await?))
    };
    let sink: Arc<dyn CatalogSink> = match &catalog {
        Some(catalog) => catalog.clone(),
        None => Arc::new(MemorySink::new()),
    };

    eprintln!("Crawling {} via {} (sink: {})", root, api_url, sink.name());

    let crawler = Crawler::new(fetcher, sink, history.clone()).with_max_concurrency(concurrency);
    let summary = crawler
        .crawl(&root, batch_size)
        .await
        .with_context(|| format!("Crawl of {} failed", root))?;

    if let Some(catalog) = catalog {
        catalog
            .record_crawl(&summary)
            .await
            .context("Failed to record crawl summary")?;
    }

    print_summary(&summary);

    let problems: Vec<_> = history
        .lines()
        .into_iter()
        .filter(|line| line.level == Level::ERROR)
        .collect();
    if !problems.is_empty() {
        println!();
        println!("Recent errors:");
        for line in problems.iter().rev() {
            println!("  {}", line.message);
        }
    }

    Ok(())
}

fn print_summary(summary: &CrawlSummary) {
    println!("Crawl ID:  {}", summary.crawl_id);
    println!("Root:      {}", summary.root);
    println!("Started:   {}", summary.started_at);
    if let Some(ms) = summary.duration_ms() {
        println!("Duration:  {}ms", ms);
    }
    println!("Enqueued:  {}", summary.enqueued);
    println!("Written:   {}", summary.written);
    println!("Conflicts: {}", summary.conflicts);
    println!("Failed:    {}", summary.failed);
    println!("Flushes:   {}", summary.flushes);
    println!("Branch errors: {}", summary.branch_errors);
}

/// List catalog records
async fn list_records(prefix: Option<String>, kind: Option<KindArg>, limit: usize) -> Result<()> {
    let catalog = open_catalog().await?;

    let query = CatalogQuery {
        prefix,
        kind: kind.map(Into::into),
        limit,
    };
    let records = catalog.list(&query).await?;

    if records.is_empty() {
        println!("No records found. Use 'slurp crawl <hash>' to add content.");
        return Ok(());
    }

    println!("{:<6} {:<22} {:<60}", "TYPE", "MIMETYPE", "ID");
    println!("{}", "-".repeat(90));

    for record in &records {
        println!(
            "{:<6} {:<22} {:<60}",
            record.kind.as_str(),
            record.mime_type.map(|m| m.as_str()).unwrap_or("-"),
            record.id
        );
    }

    println!("\nShowing {} of {} records", records.len(), catalog.count().await?);

    Ok(())
}

/// Show one catalog record
async fn show_record(id: &str) -> Result<()> {
    let catalog = open_catalog().await?;

    let record: CatalogRecord = catalog
        .get(id)
        .await?
        .with_context(|| format!("Record not found: {}", id))?;

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

/// List recent crawls
async fn show_history(limit: usize) -> Result<()> {
    let catalog = open_catalog().await?;
    let crawls = catalog.recent_crawls(limit).await?;

    if crawls.is_empty() {
        println!("No crawls recorded");
        return Ok(());
    }

    println!(
        "{:<38} {:<48} {:>8} {:>8} {:>9} {:>6}",
        "CRAWL ID", "ROOT", "ENQUEUED", "WRITTEN", "CONFLICTS", "FAILED"
    );
    println!("{}", "-".repeat(122));

    for crawl in crawls {
        println!(
            "{:<38} {:<48} {:>8} {:>8} {:>9} {:>6}",
            crawl.crawl_id.to_string(),
            crawl.root.as_str(),
            crawl.enqueued,
            crawl.written,
            crawl.conflicts,
            crawl.failed
        );
    }

    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("slurp configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("IPFS:");
    println!("  API:      {}", cfg.ipfs.api_url);
    println!("  Timeout:  {}s", cfg.ipfs.timeout_seconds);
    println!();
    println!("Crawl:");
    println!("  Default root:    {}", cfg.crawl.default_root);
    println!("  Max batch size:  {}", cfg.crawl.max_batch_size);
    println!("  Max concurrency: {}", cfg.crawl.max_concurrency);
    println!("  Log history:     {} lines", cfg.crawl.log_history);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crawl_flags() {
        let cli = Cli::parse_from([
            "slurp",
            "crawl",
            "QmRoot",
            "--batch-size",
            "0",
            "--concurrency",
            "4",
            "--dry-run",
        ]);

        match cli.command {
            Commands::Crawl {
                hash,
                batch_size,
                concurrency,
                dry_run,
                ..
            } => {
                assert_eq!(hash.as_deref(), Some("QmRoot"));
                assert_eq!(batch_size, Some(0));
                assert_eq!(concurrency, Some(4));
                assert!(dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_kind() {
        let cli = Cli::parse_from(["slurp", "list", "--kind", "dir", "--prefix", "QmRoot/"]);

        match cli.command {
            Commands::List { prefix, kind, limit } => {
                assert_eq!(prefix.as_deref(), Some("QmRoot/"));
                assert_eq!(kind.map(RecordKind::from), Some(RecordKind::Directory));
                assert_eq!(limit, 50);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
