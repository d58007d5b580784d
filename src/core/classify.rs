//! Content vs. container classification of directory nodes.

use crate::domain::{DirEntry, EntryKind};

/// Name of the marker subdirectory holding book covers
pub const COVERS_MARKER: &str = "covers";

/// How a directory node is treated by the crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryClass {
    /// Holds payload: files, a `covers` marker, or nothing at all
    Content,

    /// Pure nesting, descended without being cataloged
    Container,
}

/// Classify a directory from its immediate children.
///
/// A directory is content if it has a child named exactly `covers`, any
/// file child, or no children.
pub fn classify_directory(entries: &[DirEntry]) -> DirectoryClass {
    let has_covers = entries.iter().any(|e| e.name == COVERS_MARKER);
    let has_file = entries.iter().any(|e| e.kind == EntryKind::File);

    if has_covers || has_file || entries.is_empty() {
        DirectoryClass::Content
    } else {
        DirectoryClass::Container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_content() {
        assert_eq!(classify_directory(&[]), DirectoryClass::Content);
    }

    #[test]
    fn test_covers_is_content() {
        let entries = vec![
            DirEntry::directory("covers", "QmC"),
            DirEntry::directory("chapters", "QmD"),
        ];
        assert_eq!(classify_directory(&entries), DirectoryClass::Content);
    }

    #[test]
    fn test_covers_is_case_sensitive() {
        let entries = vec![DirEntry::directory("Covers", "QmC")];
        assert_eq!(classify_directory(&entries), DirectoryClass::Container);
    }

    #[test]
    fn test_any_file_is_content() {
        let entries = vec![
            DirEntry::directory("sub", "QmS"),
            DirEntry::file("x.jpg", "QmX"),
        ];
        assert_eq!(classify_directory(&entries), DirectoryClass::Content);
    }

    #[test]
    fn test_only_subdirectories_is_container() {
        let entries = vec![
            DirEntry::directory("a", "QmA"),
            DirEntry::other("b", "QmB"),
        ];
        assert_eq!(classify_directory(&entries), DirectoryClass::Container);
    }

    #[test]
    fn test_only_other_entries_is_container() {
        let entries = vec![DirEntry::other("link", "QmL")];
        assert_eq!(classify_directory(&entries), DirectoryClass::Container);
    }
}
