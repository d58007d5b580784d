//! Content hashes naming nodes in the DAG.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a node in the content-addressed graph (e.g. a CID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a raw hash string
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::str::FromStr for ContentHash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let trimmed = s.trim().trim_start_matches("/ipfs/");
        if trimmed.is_empty() {
            anyhow::bail!("Content hash must not be empty");
        }
        Ok(Self::new(trimmed))
    }
}
