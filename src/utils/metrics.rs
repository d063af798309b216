use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Why a popped task was dropped without producing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySeen,
    RobotsDisallowed,
    RobotsError,
    DepthExceeded,
    FetchFailed,
    ParseFailed,
    DuplicateContent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipReason::AlreadySeen => "already seen",
            SkipReason::RobotsDisallowed => "disallowed by robots.txt",
            SkipReason::RobotsError => "robots.txt lookup error",
            SkipReason::DepthExceeded => "depth exceeded",
            SkipReason::FetchFailed => "fetch failed",
            SkipReason::ParseFailed => "parse failed",
            SkipReason::DuplicateContent => "duplicate content",
        };
        f.write_str(name)
    }
}

/// Counters for one crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Identifier of the run, for correlating logs
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Pages fetched, parsed and accepted as new content
    pub pages_crawled: usize,

    /// Tasks dropped, by reason
    pub skipped: BTreeMap<SkipReason, usize>,

    /// Links seen on accepted pages
    pub links_discovered: usize,

    /// Links that passed filtering and were queued
    pub links_enqueued: usize,

    pub bytes_downloaded: usize,

    /// Total time spent in successful fetches
    pub fetch_millis: u64,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            pages_crawled: 0,
            skipped: BTreeMap::new(),
            links_discovered: 0,
            links_enqueued: 0,
            bytes_downloaded: 0,
            fetch_millis: 0,
        }
    }
}

impl CrawlStats {
    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Wall time of the run so far, or of the whole run once finished
    pub fn elapsed_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as f64 / 1000.0
    }

    /// Mean duration of successful fetches in milliseconds
    pub fn average_fetch_millis(&self) -> f64 {
        if self.pages_crawled == 0 {
            return 0.0;
        }
        self.fetch_millis as f64 / self.pages_crawled as f64
    }
}

/// Shared, lockable crawl statistics
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    stats: Arc<Mutex<CrawlStats>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted page
    pub async fn record_page(&self, bytes: usize, duration_ms: u64) {
        let mut stats = self.stats.lock().await;
        stats.pages_crawled += 1;
        stats.bytes_downloaded += bytes;
        stats.fetch_millis += duration_ms;
    }

    pub async fn record_skip(&self, reason: SkipReason) {
        let mut stats = self.stats.lock().await;
        *stats.skipped.entry(reason).or_default() += 1;
    }

    pub async fn record_links(&self, discovered: usize, enqueued: usize) {
        let mut stats = self.stats.lock().await;
        stats.links_discovered += discovered;
        stats.links_enqueued += enqueued;
    }

    /// Stamp the end time
    pub async fn finish(&self) {
        self.stats.lock().await.finished_at = Some(Utc::now());
    }

    /// Start timing a request
    pub fn start_timer(&self) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
        }
    }

    /// Snapshot of the current counters
    pub async fn snapshot(&self) -> CrawlStats {
        self.stats.lock().await.clone()
    }
}

/// Request timer for measuring request durations
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    /// End timing and get the duration in milliseconds
    pub fn end(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_accumulate() {
        let metrics = MetricsCollector::new();

        metrics.record_page(100, 20).await;
        metrics.record_page(50, 40).await;
        metrics.record_skip(SkipReason::AlreadySeen).await;
        metrics.record_skip(SkipReason::AlreadySeen).await;
        metrics.record_skip(SkipReason::FetchFailed).await;
        metrics.record_links(10, 4).await;

        let stats = metrics.snapshot().await;
        assert_eq!(stats.pages_crawled, 2);
        assert_eq!(stats.bytes_downloaded, 150);
        assert_eq!(stats.average_fetch_millis(), 30.0);
        assert_eq!(stats.skipped(SkipReason::AlreadySeen), 2);
        assert_eq!(stats.skipped(SkipReason::DepthExceeded), 0);
        assert_eq!(stats.total_skipped(), 3);
        assert_eq!((stats.links_discovered, stats.links_enqueued), (10, 4));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let metrics = MetricsCollector::new();
        let other = metrics.clone();

        other.record_skip(SkipReason::DuplicateContent).await;
        metrics.finish().await;

        let stats = metrics.snapshot().await;
        assert_eq!(stats.skipped(SkipReason::DuplicateContent), 1);
        assert!(stats.finished_at.is_some());
    }

    #[test]
    fn test_stats_serialize_with_snake_case_reasons() {
        let mut stats = CrawlStats::default();
        stats.skipped.insert(SkipReason::RobotsDisallowed, 3);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["skipped"]["robots_disallowed"], 3);
    }

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = MetricsCollector::new().start_timer();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.end() >= 5);
    }
}
