use std::sync::Arc;
use tracing::info;

use crate::cli::config::{DedupSettings, UrlSeenStrategy};
use crate::storage::bloom::BloomError;
use crate::storage::content_seen::ContentSeen;
use crate::storage::url_seen::{BloomUrlSeen, ExactUrlSeen, UrlSeen};

/// URL-seen and content-seen tracking used by the crawl loop
///
/// Both halves lock independently; cloning shares the same state.
#[derive(Clone)]
pub struct Deduplicator {
    urls: Arc<dyn UrlSeen>,
    content: Arc<ContentSeen>,
}

impl Deduplicator {
    /// Use the given URL-seen strategy and an empty content table
    pub fn new(urls: Arc<dyn UrlSeen>) -> Self {
        Self {
            urls,
            content: Arc::new(ContentSeen::new()),
        }
    }

    /// Build the strategy named in the settings
    pub fn from_settings(settings: &DedupSettings) -> Result<Self, BloomError> {
        let urls: Arc<dyn UrlSeen> = match settings.strategy {
            UrlSeenStrategy::Exact => {
                info!("Using exact URL deduplication");
                Arc::new(ExactUrlSeen::new())
            }
            UrlSeenStrategy::Bloom => {
                let seen = BloomUrlSeen::with_max_exact(
                    settings.expected_urls,
                    settings.false_positive_rate,
                    settings.max_exact,
                )?;
                info!(
                    "Using Bloom URL deduplication (expected {}, p={}, exact {})",
                    settings.expected_urls, settings.false_positive_rate, settings.max_exact
                );
                Arc::new(seen)
            }
        };

        Ok(Self::new(urls))
    }

    pub async fn has_seen(&self, url: &str) -> bool {
        self.urls.has_seen(url).await
    }

    pub async fn mark_seen(&self, url: &str) {
        self.urls.mark_seen(url).await
    }

    /// Original URL if this text was already recorded
    pub async fn has_seen_content(&self, text: &str) -> Option<String> {
        self.content.has_seen_content(text).await
    }

    pub async fn mark_content_seen(&self, text: &str, url: &str) {
        self.content.mark_content_seen(text, url).await
    }

    /// Number of distinct page texts recorded
    pub async fn content_count(&self) -> usize {
        self.content.len().await
    }
}
