//! Child entries returned when listing a directory node.

use serde::{Deserialize, Serialize};

use super::hash::ContentHash;

/// Kind of a child link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
    /// Raw blocks, symlinks, and anything else the store can link to
    Other,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Directory => write!(f, "dir"),
            EntryKind::File => write!(f, "file"),
            EntryKind::Other => write!(f, "other"),
        }
    }
}

/// One child reference of a directory node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Link name as stored in the DAG (may be percent-encoded)
    pub name: String,

    pub kind: EntryKind,

    /// Hash of the child node
    pub hash: ContentHash,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind, hash: impl Into<ContentHash>) -> Self {
        Self {
            name: name.into(),
            kind,
            hash: hash.into(),
        }
    }

    pub fn directory(name: impl Into<String>, hash: impl Into<ContentHash>) -> Self {
        Self::new(name, EntryKind::Directory, hash)
    }

    pub fn file(name: impl Into<String>, hash: impl Into<ContentHash>) -> Self {
        Self::new(name, EntryKind::File, hash)
    }

    pub fn other(name: impl Into<String>, hash: impl Into<ContentHash>) -> Self {
        Self::new(name, EntryKind::Other, hash)
    }

    /// Name used as a path segment.
    ///
    /// Percent-encoded names are decoded; names that do not decode to valid
    /// UTF-8 are used verbatim.
    pub fn segment(&self) -> String {
        urlencoding::decode(&self.name)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_decodes_percent_encoding() {
        let entry = DirEntry::file("Le%20Petit%20Prince.epub", "QmA");
        assert_eq!(entry.segment(), "Le Petit Prince.epub");
    }

    #[test]
    fn test_segment_keeps_undecodable_name() {
        let entry = DirEntry::file("bad%FF.jpg", "QmA");
        assert_eq!(entry.segment(), "bad%FF.jpg");
    }

    #[test]
    fn test_plain_name_unchanged() {
        assert_eq!(DirEntry::directory("covers", "QmC").segment(), "covers");
    }
}
