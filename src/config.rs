//! Configuration for slurp.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SLURP_HOME, SLURP_DATABASE, SLURP_API_URL)
//! 2. Config file (.slurp/config.yaml)
//! 3. Defaults (~/.slurp)
//!
//! Config file discovery:
//! - Searches current directory and parents for .slurp/config.yaml
//! - Paths in config file are relative to the .slurp/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::ipfs::DEFAULT_API_URL;
use crate::core::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY};
use crate::domain::ContentHash;
use crate::log::DEFAULT_HISTORY_LEN;

/// Hash crawled when none is given
pub const DEFAULT_ROOT_HASH: &str = "QmUCEx1poBu726HioY2SEsY3PjCwyGxP79SAiCrr56TRkM";

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub ipfs: Option<IpfsConfig>,
    #[serde(default)]
    pub crawl: Option<CrawlConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .slurp/)
    pub home: Option<String>,
    /// Catalog database file (relative to .slurp/)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpfsConfig {
    pub api_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    pub max_batch_size: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub default_root: Option<String>,
    pub log_history: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to slurp home
    pub home: PathBuf,
    /// Absolute path to the catalog database
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub ipfs: IpfsSettings,
    pub crawl: CrawlSettings,
}

#[derive(Debug, Clone)]
pub struct IpfsSettings {
    pub api_url: String,
    pub timeout_seconds: u64,
}

impl IpfsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for IpfsSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Records per bulk write (0 = single write at the end)
    pub max_batch_size: usize,
    pub max_concurrency: usize,
    pub default_root: ContentHash,
    pub log_history: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_root: ContentHash::from(DEFAULT_ROOT_HASH),
            log_history: DEFAULT_HISTORY_LEN,
        }
    }
}

impl IpfsSettings {
    fn from_file(file: Option<&IpfsConfig>) -> Self {
        let defaults = Self::default();
        Self {
            api_url: file
                .and_then(|c| c.api_url.clone())
                .unwrap_or(defaults.api_url),
            timeout_seconds: file
                .and_then(|c| c.timeout_seconds)
                .unwrap_or(defaults.timeout_seconds),
        }
    }
}

impl CrawlSettings {
    fn from_file(file: Option<&CrawlConfig>) -> Result<Self> {
        let defaults = Self::default();
        let default_root = match file.and_then(|c| c.default_root.as_deref()) {
            Some(root) => root
                .parse()
                .with_context(|| format!("Invalid default_root: {:?}", root))?,
            None => defaults.default_root,
        };

        Ok(Self {
            max_batch_size: file
                .and_then(|c| c.max_batch_size)
                .unwrap_or(defaults.max_batch_size),
            max_concurrency: file
                .and_then(|c| c.max_concurrency)
                .unwrap_or(defaults.max_concurrency)
                .max(1),
            default_root,
            log_history: file
                .and_then(|c| c.log_history)
                .unwrap_or(defaults.log_history),
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".slurp").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Build the resolved config from an optional parsed file.
///
/// Environment variables win over anything in the file.
fn resolve(config_path: Option<&Path>, file: Option<ConfigFile>, default_home: PathBuf) -> Result<ResolvedConfig> {
    let slurp_dir = config_path
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));

    let home = if let Ok(env_home) = std::env::var("SLURP_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.paths.home.as_deref()) {
        resolve_path(slurp_dir, home_path)
    } else {
        default_home
    };

    let database = if let Ok(env_db) = std::env::var("SLURP_DATABASE") {
        PathBuf::from(env_db)
    } else if let Some(db_path) = file.as_ref().and_then(|f| f.paths.database.as_deref()) {
        resolve_path(slurp_dir, db_path)
    } else {
        home.join("catalog.db")
    };

    let mut ipfs = IpfsSettings::from_file(file.as_ref().and_then(|f| f.ipfs.as_ref()));
    if let Ok(env_api) = std::env::var("SLURP_API_URL") {
        ipfs.api_url = env_api;
    }

    let crawl = CrawlSettings::from_file(file.as_ref().and_then(|f| f.crawl.as_ref()))?;

    Ok(ResolvedConfig {
        home,
        database,
        config_file: config_path.map(Path::to_path_buf),
        ipfs,
        crawl,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".slurp");

    match find_config_file() {
        Some(config_path) => {
            let file = load_config_file(&config_path)?;
            resolve(Some(&config_path), Some(file), default_home)
        }
        None => resolve(None, None, default_home),
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the catalog database path
pub fn database_path() -> Result<PathBuf> {
    Ok(config()?.database.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, body: &str) -> PathBuf {
        let slurp_dir = temp.path().join(".slurp");
        std::fs::create_dir_all(&slurp_dir).unwrap();

        let config_path = slurp_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        config_path
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  home: ./state
  database: ./state/catalog.db
ipfs:
  api_url: http://ipfs.local:5001
  timeout_seconds: 5
crawl:
  max_batch_size: 100
  max_concurrency: 4
"#,
        );

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./state".to_string()));
        assert_eq!(
            config.ipfs.as_ref().unwrap().api_url.as_deref(),
            Some("http://ipfs.local:5001")
        );
        let crawl = config.crawl.unwrap();
        assert_eq!(crawl.max_batch_size, Some(100));
        assert_eq!(crawl.max_concurrency, Some(4));
        assert!(crawl.default_root.is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let ipfs = IpfsSettings::from_file(None);
        assert_eq!(ipfs.api_url, "http://127.0.0.1:5001");
        assert_eq!(ipfs.timeout(), Duration::from_secs(60));

        let crawl = CrawlSettings::from_file(None).unwrap();
        assert_eq!(crawl.max_batch_size, 500);
        assert_eq!(crawl.max_concurrency, 16);
        assert_eq!(crawl.log_history, 150);
        assert_eq!(crawl.default_root.as_str(), DEFAULT_ROOT_HASH);
    }

    #[test]
    fn test_crawl_settings_from_file() {
        let file = CrawlConfig {
            max_batch_size: Some(0),
            max_concurrency: Some(0),
            default_root: Some("/ipfs/QmOther".to_string()),
            log_history: None,
        };

        let crawl = CrawlSettings::from_file(Some(&file)).unwrap();
        assert_eq!(crawl.max_batch_size, 0);
        // at least one task must be able to run
        assert_eq!(crawl.max_concurrency, 1);
        assert_eq!(crawl.default_root.as_str(), "QmOther");
        assert_eq!(crawl.log_history, 150);
    }

    #[test]
    fn test_blank_default_root_rejected() {
        let file = CrawlConfig {
            max_batch_size: None,
            max_concurrency: None,
            default_root: Some("   ".to_string()),
            log_history: None,
        };

        assert!(CrawlSettings::from_file(Some(&file)).is_err());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project/.slurp");

        assert_eq!(
            resolve_path(&base, "./state"),
            PathBuf::from("/home/user/project/.slurp/state")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/catalog.db"),
            PathBuf::from("/absolute/catalog.db")
        );
    }
}
