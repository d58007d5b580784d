//! Catalog records emitted by a crawl.
//!
//! Records are serialized in the document layout consumed by the catalog
//! readers:
//!
//! ```json
//! { "_id": "QmRoot/books/a.epub", "type": "file",
//!   "path": ["QmRoot", "books", "a.epub"], "ipfs_id": "QmFile",
//!   "mimetype": "application/epub+zip" }
//! ```
//!
//! Directory ids carry one trailing `/` and have no `mimetype`.

use serde::{Deserialize, Serialize};

use super::hash::ContentHash;
use super::mime::MediaType;

/// Separator used to join path segments into ids
pub const PATH_SEPARATOR: &str = "/";

/// Logical location of a node relative to the traversal root
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSegments(Vec<String>);

impl PathSegments {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Path consisting of a single root segment
    pub fn root(hash: &ContentHash) -> Self {
        Self(vec![hash.as_str().to_string()])
    }

    /// A new path with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Segments joined with `/`
    pub fn join(&self) -> String {
        self.0.join(PATH_SEPARATOR)
    }
}

impl From<Vec<String>> for PathSegments {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl std::fmt::Display for PathSegments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.join())
    }
}

/// Kind of catalog record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "file")]
    File,

    #[serde(rename = "dir")]
    Directory,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::File => "file",
            RecordKind::Directory => "dir",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique id derived from the path
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "type")]
    pub kind: RecordKind,

    pub path: PathSegments,

    #[serde(rename = "ipfs_id")]
    pub content_hash: ContentHash,

    /// Only present on file records
    #[serde(rename = "mimetype", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<MediaType>,
}

impl CatalogRecord {
    /// Record for a leaf file
    pub fn file(path: PathSegments, content_hash: ContentHash, mime_type: MediaType) -> Self {
        Self {
            id: path.join(),
            kind: RecordKind::File,
            path,
            content_hash,
            mime_type: Some(mime_type),
        }
    }

    /// Record for a content directory
    pub fn directory(path: PathSegments, content_hash: ContentHash) -> Self {
        Self {
            id: format!("{}{}", path.join(), PATH_SEPARATOR),
            kind: RecordKind::Directory,
            path,
            content_hash,
            mime_type: None,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == RecordKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> PathSegments {
        segments.iter().map(|s| s.to_string()).collect::<Vec<_>>().into()
    }

    #[test]
    fn test_file_record_id() {
        let record = CatalogRecord::file(
            path(&["root", "a", "b.jpg"]),
            ContentHash::from("QmB"),
            crate::domain::mime::classify("b.jpg"),
        );

        assert_eq!(record.id, "root/a/b.jpg");
        assert_eq!(record.mime_type, Some(MediaType::Jpeg));
        assert_eq!(record.kind, RecordKind::File);
    }

    #[test]
    fn test_directory_record_id_has_trailing_separator() {
        let record = CatalogRecord::directory(path(&["root", "a"]), ContentHash::from("QmA"));

        assert_eq!(record.id, "root/a/");
        assert!(record.is_directory());
        assert!(record.mime_type.is_none());
    }

    #[test]
    fn test_document_layout() {
        let record = CatalogRecord::file(
            path(&["QmRoot", "book.epub"]),
            ContentHash::from("QmBook"),
            MediaType::Epub,
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["_id"], "QmRoot/book.epub");
        assert_eq!(json["type"], "file");
        assert_eq!(json["path"], serde_json::json!(["QmRoot", "book.epub"]));
        assert_eq!(json["ipfs_id"], "QmBook");
        assert_eq!(json["mimetype"], "application/epub+zip");
    }

    #[test]
    fn test_directory_layout_omits_mimetype() {
        let record = CatalogRecord::directory(path(&["QmRoot", "a"]), ContentHash::from("QmA"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "dir");
        assert!(json.get("mimetype").is_none());
    }

    #[test]
    fn test_child_does_not_mutate_parent() {
        let parent = PathSegments::root(&ContentHash::from("QmRoot"));
        let child = parent.child("a");

        assert_eq!(parent.len(), 1);
        assert_eq!(child.join(), "QmRoot/a");
    }
}
