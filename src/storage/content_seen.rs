use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Tracks hashes of extracted page text and the first URL that produced each
#[derive(Debug, Default)]
pub struct ContentSeen {
    hashes: RwLock<HashMap<String, String>>,
}

/// Hex-encoded SHA-256 of `content`
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

impl ContentSeen {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the page that first produced `content`, if any
    pub async fn has_seen_content(&self, content: &str) -> Option<String> {
        let hash = content_hash(content);
        self.hashes.read().await.get(&hash).cloned()
    }

    /// Record `content` as produced by `url`; the first recorded URL is kept
    pub async fn mark_content_seen(&self, content: &str, url: &str) {
        let hash = content_hash(content);
        self.hashes
            .write()
            .await
            .entry(hash)
            .or_insert_with(|| url.to_string());
    }

    /// Number of distinct content hashes recorded
    pub async fn len(&self) -> usize {
        self.hashes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hashes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_fixed_size_hex() {
        let hash = content_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn test_first_writer_wins() {
        let seen = ContentSeen::new();
        assert_eq!(seen.has_seen_content("same text").await, None);

        seen.mark_content_seen("same text", "https://a.com/1").await;
        seen.mark_content_seen("same text", "https://a.com/2").await;
        seen.mark_content_seen("same text", "https://a.com/3").await;

        assert_eq!(
            seen.has_seen_content("same text").await.as_deref(),
            Some("https://a.com/1")
        );
        assert_eq!(seen.len().await, 1);
    }

    #[test]
    fn test_empty_table() {
        let seen = ContentSeen::new();
        tokio_test::block_on(async {
            assert!(seen.is_empty().await);
            assert_eq!(seen.has_seen_content("").await, None);
        });
    }

    #[tokio::test]
    async fn test_detection_is_exact_on_text() {
        let seen = ContentSeen::new();
        seen.mark_content_seen("Some text ", "https://a.com/").await;

        assert!(seen.has_seen_content("Some text ").await.is_some());
        assert!(seen.has_seen_content("Some text").await.is_none());
        assert!(seen.has_seen_content("some text ").await.is_none());
    }
}
