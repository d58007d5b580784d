//! IPFS HTTP RPC adapter.
//!
//! Talks to a local (or remote) IPFS node through its `/api/v0` endpoints:
//! `ls` for directory listings and `block/get` for raw blocks. Every RPC call
//! is a POST with the hash passed as `arg`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchError, NodeFetcher};
use crate::domain::{ContentHash, DirEntry, EntryKind};

/// Default RPC endpoint of a local node
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";

/// UnixFS link types reported by `ls`
const LINK_TYPE_DIRECTORY: i64 = 1;
const LINK_TYPE_FILE: i64 = 2;
const LINK_TYPE_HAMT_SHARD: i64 = 5;

/// IPFS RPC client
pub struct IpfsClient {
    /// Base URL of the RPC API (without `/api/v0`)
    api_url: String,
    /// HTTP client
    client: reqwest::Client,
}

/// Response from `ls`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsResponse {
    #[serde(default)]
    objects: Vec<LsObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsObject {
    #[serde(default)]
    links: Vec<LsLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsLink {
    name: String,
    hash: String,
    #[serde(default, rename = "Type")]
    link_type: i64,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    message: String,
}

impl Default for IpfsClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl IpfsClient {
    /// Create a client for the given RPC base URL
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            client,
        })
    }

    /// Build RPC URL
    fn api_url(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.api_url.trim_end_matches('/'), command)
    }

    /// Issue an RPC call for `hash`, mapping non-2xx responses to errors
    async fn call(&self, command: &str, hash: &ContentHash) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .post(self.api_url(command))
            .query(&[("arg", hash.as_str())])
            .send()
            .await
            .map_err(|source| FetchError::Http {
                hash: hash.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = parse_error_message(&body);
        if message.contains("not found") {
            return Err(FetchError::NotFound(hash.clone()));
        }

        Err(FetchError::Api {
            hash: hash.clone(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl NodeFetcher for IpfsClient {
    fn name(&self) -> &str {
        "ipfs"
    }

    async fn list(&self, hash: &ContentHash) -> Result<Vec<DirEntry>, FetchError> {
        let response = self.call("ls", hash).await?;
        let body = response.text().await.map_err(|source| FetchError::Http {
            hash: hash.clone(),
            source,
        })?;

        parse_ls(hash, &body)
    }

    async fn get_block(&self, hash: &ContentHash) -> Result<Vec<u8>, FetchError> {
        let response = self.call("block/get", hash).await?;
        let bytes = response.bytes().await.map_err(|source| FetchError::Http {
            hash: hash.clone(),
            source,
        })?;

        Ok(bytes.to_vec())
    }
}

/// Parse the JSON body of an `ls` response into entries
fn parse_ls(hash: &ContentHash, body: &str) -> Result<Vec<DirEntry>, FetchError> {
    let response: LsResponse = serde_json::from_str(body).map_err(|e| FetchError::Malformed {
        hash: hash.clone(),
        reason: e.to_string(),
    })?;

    let object = response
        .objects
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Malformed {
            hash: hash.clone(),
            reason: "no objects in listing".to_string(),
        })?;

    Ok(object
        .links
        .into_iter()
        .map(|link| DirEntry::new(link.name, entry_kind(link.link_type), link.hash))
        .collect())
}

fn entry_kind(link_type: i64) -> EntryKind {
    match link_type {
        LINK_TYPE_DIRECTORY | LINK_TYPE_HAMT_SHARD => EntryKind::Directory,
        LINK_TYPE_FILE => EntryKind::File,
        _ => EntryKind::Other,
    }
}

/// Extract `Message` from an error body, falling back to the raw text
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
