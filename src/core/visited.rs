//! Crawl-scoped record of re-rooted directory hashes.

use dashmap::DashSet;

use crate::domain::ContentHash;

/// Tracks which content directories have already been re-rooted.
///
/// A shared subtree can be reached through several parents; the first branch
/// to insert its hash wins and every later branch skips the re-root. The
/// insert is an atomic test-and-set, so concurrent branches cannot both win.
#[derive(Debug, Default)]
pub struct VisitedSet {
    seen: DashSet<ContentHash>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Mark a hash as visited. Returns `true` if this is the first time.
    pub fn insert(&self, hash: &ContentHash) -> bool {
        self.seen.insert(hash.clone())
    }

    /// Check if a hash has been visited (without marking it)
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.seen.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_once() {
        let visited = VisitedSet::new();
        let hash = ContentHash::from("QmA");

        assert!(!visited.contains(&hash));
        assert!(visited.insert(&hash));
        assert!(!visited.insert(&hash)); // second time returns false
        assert!(visited.contains(&hash));
        assert_eq!(visited.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_have_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let hash = ContentHash::from("QmShared");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let hash = hash.clone();
                tokio::spawn(async move { visited.insert(&hash) })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_clear() {
        let visited = VisitedSet::new();
        visited.insert(&ContentHash::from("QmA"));
        visited.clear();
        assert!(visited.is_empty());
    }
}
