use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::storage::bloom::{BloomError, BloomFilter};

/// Default number of URLs tracked exactly by [`BloomUrlSeen`]
pub const DEFAULT_MAX_EXACT: usize = 1000;

/// Membership test for URLs that have already been handled
#[async_trait]
pub trait UrlSeen: Send + Sync {
    /// Whether `url` has been marked (may be a false positive for probabilistic stores)
    async fn has_seen(&self, url: &str) -> bool;

    /// Record `url` as seen; there is no way to forget it
    async fn mark_seen(&self, url: &str);
}

/// Exact set of every URL seen; memory grows with the crawl
#[derive(Debug, Default)]
pub struct ExactUrlSeen {
    seen: RwLock<HashSet<String>>,
}

impl ExactUrlSeen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct URLs marked so far
    pub async fn count(&self) -> usize {
        self.seen.read().await.len()
    }
}

#[async_trait]
impl UrlSeen for ExactUrlSeen {
    async fn has_seen(&self, url: &str) -> bool {
        self.seen.read().await.contains(url)
    }

    async fn mark_seen(&self, url: &str) {
        self.seen.write().await.insert(url.to_string());
    }
}

#[derive(Debug)]
struct BloomState {
    filter: BloomFilter,
    exact: HashSet<String>,
    inserted: usize,
}

/// Exact set for the earliest URLs, Bloom filter for all of them
///
/// URLs past the exact-set bound rely on the filter, so a never-seen URL can
/// occasionally be reported as seen and skipped.
#[derive(Debug)]
pub struct BloomUrlSeen {
    state: RwLock<BloomState>,
    max_exact: usize,
}

impl BloomUrlSeen {
    /// Filter sized for `expected_urls` at `false_positive_rate`, exact set capped at
    /// [`DEFAULT_MAX_EXACT`]
    pub fn new(expected_urls: usize, false_positive_rate: f64) -> Result<Self, BloomError> {
        Self::with_max_exact(expected_urls, false_positive_rate, DEFAULT_MAX_EXACT)
    }

    pub fn with_max_exact(
        expected_urls: usize,
        false_positive_rate: f64,
        max_exact: usize,
    ) -> Result<Self, BloomError> {
        let filter = BloomFilter::new(expected_urls, false_positive_rate)?;
        Ok(Self {
            state: RwLock::new(BloomState {
                filter,
                exact: HashSet::new(),
                inserted: 0,
            }),
            max_exact,
        })
    }

    /// Number of `mark_seen` calls so far (repeats included)
    pub async fn inserted_count(&self) -> usize {
        self.state.read().await.inserted
    }

    /// Estimated false-positive rate at the current insert count
    pub async fn false_positive_rate(&self) -> f64 {
        let state = self.state.read().await;
        state.filter.estimate_false_positive_rate(state.inserted)
    }

    /// `(bits, hash functions, insertions)`
    pub async fn bloom_stats(&self) -> (u64, u32, usize) {
        let state = self.state.read().await;
        (state.filter.bit_count(), state.filter.hash_count(), state.inserted)
    }
}

#[async_trait]
impl UrlSeen for BloomUrlSeen {
    async fn has_seen(&self, url: &str) -> bool {
        let state = self.state.read().await;
        state.exact.contains(url) || state.filter.test(url.as_bytes())
    }

    async fn mark_seen(&self, url: &str) {
        let mut state = self.state.write().await;
        state.filter.add(url.as_bytes());
        state.inserted += 1;

        if state.exact.len() < self.max_exact {
            state.exact.insert(url.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_strategy() {
        let seen = ExactUrlSeen::new();
        assert!(!seen.has_seen("https://example.com/").await);

        seen.mark_seen("https://example.com/").await;
        seen.mark_seen("https://example.com/").await;

        assert!(seen.has_seen("https://example.com/").await);
        assert!(!seen.has_seen("https://example.com/other").await);
        assert_eq!(seen.count().await, 1);
    }

    #[tokio::test]
    async fn test_bloom_strategy_marks_are_always_seen() {
        let seen = BloomUrlSeen::with_max_exact(500, 0.01, 10).unwrap();
        let urls: Vec<String> = (0..500).map(|i| format!("https://example.com/{}", i)).collect();

        for url in &urls {
            seen.mark_seen(url).await;
        }
        for url in &urls {
            assert!(seen.has_seen(url).await);
        }
        assert_eq!(seen.inserted_count().await, 500);
    }

    #[tokio::test]
    async fn test_exact_set_is_capped() {
        let seen = BloomUrlSeen::with_max_exact(1_000, 0.01, 3).unwrap();
        for i in 0..10 {
            seen.mark_seen(&format!("https://example.com/{}", i)).await;
        }

        let state = seen.state.read().await;
        assert_eq!(state.exact.len(), 3);
        assert!(state.exact.contains("https://example.com/0"));
        assert!(!state.exact.contains("https://example.com/9"));
    }

    #[tokio::test]
    async fn test_bloom_stats_and_rate() {
        let seen = BloomUrlSeen::new(10_000, 0.01).unwrap();
        assert_eq!(seen.false_positive_rate().await, 0.0);

        seen.mark_seen("https://example.com/").await;
        let (bits, hashes, inserted) = seen.bloom_stats().await;
        assert_eq!(bits, 95_851);
        assert_eq!(hashes, 7);
        assert_eq!(inserted, 1);
        assert!(seen.false_positive_rate().await > 0.0);
    }

    #[tokio::test]
    async fn test_strategies_behind_trait_object() {
        let strategies: Vec<Box<dyn UrlSeen>> = vec![
            Box::new(ExactUrlSeen::new()),
            Box::new(BloomUrlSeen::new(100, 0.01).unwrap()),
        ];

        for seen in strategies {
            seen.mark_seen("https://example.com/a").await;
            assert!(seen.has_seen("https://example.com/a").await);
        }
    }
}
