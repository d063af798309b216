use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::cli::config::{CrawlerConfig, CrawlerSettings};
use crate::crawler::robots::RobotsCache;
use crate::crawler::scheduler::{Filter, UrlFilter};
use crate::crawler::task::{domain_of, CrawlTask, Priority};
use crate::fetch::{Extractor, Fetcher, HtmlExtractor, HttpFetcher};
use crate::storage::bloom::BloomError;
use crate::storage::{Deduplicator, Frontier};
use crate::utils::metrics::{CrawlStats, MetricsCollector, SkipReason};

/// Errors surfaced to the caller; nothing inside the crawl loop is fatal
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid seed URL {url}: {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL filtered: {0}")]
    FilteredSeed(String),

    #[error("invalid deduplication settings: {0}")]
    Dedup(#[from] BloomError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Lifecycle of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Running,
    Draining,
    Done,
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrawlState::Idle => "idle",
            CrawlState::Running => "running",
            CrawlState::Draining => "draining",
            CrawlState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Drives the crawl: frontier, dedup, robots, fetch, parse, link discovery
pub struct CrawlerController {
    settings: CrawlerSettings,
    frontier: Arc<Frontier>,
    dedup: Deduplicator,
    robots: Arc<RobotsCache>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    filter: Arc<dyn Filter>,
    metrics: MetricsCollector,
    state: CrawlState,
}

impl CrawlerController {
    /// Create a crawler controller with HTTP fetching and HTML extraction
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let user_agent = config.crawler.user_agent.as_str();
        let fetcher = HttpFetcher::new(user_agent, config.http.fetch_timeout())?;
        let robots = RobotsCache::new(user_agent, config.http.robots_timeout())?;
        let dedup = Deduplicator::from_settings(&config.dedup)?;
        let filter = UrlFilter::from_settings(&config.crawler, &config.filter);

        Ok(Self {
            settings: config.crawler,
            frontier: Arc::new(Frontier::new()),
            dedup,
            robots: Arc::new(robots),
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(HtmlExtractor::new()),
            filter: Arc::new(filter),
            metrics: MetricsCollector::new(),
            state: CrawlState::Idle,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_robots(mut self, robots: RobotsCache) -> Self {
        self.robots = Arc::new(robots);
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn frontier(&self) -> Arc<Frontier> {
        Arc::clone(&self.frontier)
    }

    pub fn dedup(&self) -> &Deduplicator {
        &self.dedup
    }

    /// Queue a seed at depth 0
    pub async fn add_seed(&self, url: &str, priority: Priority) -> Result<(), CrawlError> {
        let parsed = Url::parse(url).map_err(|source| CrawlError::InvalidSeed {
            url: url.to_string(),
            source,
        })?;

        if !self.filter.should_crawl(url) {
            return Err(CrawlError::FilteredSeed(url.to_string()));
        }

        info!("Adding seed {} ({})", url, priority);
        self.frontier.add(CrawlTask::new(&parsed, priority, 0)).await;
        Ok(())
    }

    /// Crawl until the frontier is empty (or the page limit is reached)
    pub async fn run(&mut self) -> CrawlStats {
        self.state = CrawlState::Running;
        info!(
            "Crawl started. User-Agent: '{}', max depth {}, base delay {:?}",
            self.settings.user_agent,
            self.settings.max_depth,
            self.settings.politeness_delay()
        );

        while self.state == CrawlState::Running {
            let Some(task) = self.frontier.next().await else {
                self.state = CrawlState::Draining;
                break;
            };

            if let Some(delay) = self.process_task(task).await {
                if self.page_limit_reached().await {
                    info!("Page limit of {} reached", self.settings.max_pages);
                    self.state = CrawlState::Draining;
                    break;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        self.metrics.finish().await;
        let stats = self.metrics.snapshot().await;
        self.state = CrawlState::Done;

        info!(
            "Crawl finished: {} pages, {} skipped, {} links queued in {:.2}s",
            stats.pages_crawled,
            stats.total_skipped(),
            stats.links_enqueued,
            stats.elapsed_seconds()
        );
        stats
    }

    async fn page_limit_reached(&self) -> bool {
        self.settings.max_pages > 0
            && self.metrics.snapshot().await.pages_crawled >= self.settings.max_pages as usize
    }

    /// The longer of the configured politeness delay and the domain's crawl-delay
    fn effective_delay(&self, robots_delay: Duration) -> Duration {
        self.settings.politeness_delay().max(robots_delay)
    }

    async fn skip(&self, reason: SkipReason) -> Option<Duration> {
        self.metrics.record_skip(reason).await;
        None
    }

    /// One loop iteration. Returns the pause to take afterwards, or `None` when the
    /// task was dropped before link discovery.
    async fn process_task(&self, task: CrawlTask) -> Option<Duration> {
        if self.dedup.has_seen(&task.url).await {
            debug!("Skipping already seen URL: {}", task.url);
            return self.skip(SkipReason::AlreadySeen).await;
        }

        let robots_delay = match self.robots.can_crawl(&task.url).await {
            Ok((true, delay)) => delay,
            Ok((false, _)) => {
                info!("Robots.txt disallows crawling: {}", task.url);
                return self.skip(SkipReason::RobotsDisallowed).await;
            }
            Err(e) => {
                warn!("Error checking robots for {}: {}", task.url, e);
                return self.skip(SkipReason::RobotsError).await;
            }
        };

        let delay = self.effective_delay(robots_delay);

        self.dedup.mark_seen(&task.url).await;

        if task.depth > self.settings.max_depth {
            debug!("Skipping {} at depth {} (max {})", task.url, task.depth, self.settings.max_depth);
            return self.skip(SkipReason::DepthExceeded).await;
        }

        info!("Crawling: {} (depth: {}, priority: {})", task.url, task.depth, task.priority);

        let timer = self.metrics.start_timer();
        let body = match self.fetcher.get(&task.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Error downloading {}: {}", task.url, e);
                return self.skip(SkipReason::FetchFailed).await;
            }
        };
        let fetch_ms = timer.end();
        let bytes = body.len();

        let content = match self.extractor.parse(body, &task.url) {
            Ok(content) => content,
            Err(e) => {
                warn!("Error parsing {}: {}", task.url, e);
                return self.skip(SkipReason::ParseFailed).await;
            }
        };

        if let Some(original) = self.dedup.has_seen_content(&content.text_content).await {
            info!("Duplicate content found: {} (original: {})", task.url, original);
            return self.skip(SkipReason::DuplicateContent).await;
        }

        self.dedup.mark_content_seen(&content.text_content, &task.url).await;
        self.metrics.record_page(bytes, fetch_ms).await;
        debug!("Processed {}: title={:?}, links={}", content.url, content.title, content.links.len());

        let enqueued = self.enqueue_links(&content.links, &task).await;
        self.metrics.record_links(content.links.len(), enqueued).await;

        Some(delay)
    }

    /// Queue unseen, unfiltered links one hop below `parent`
    async fn enqueue_links(&self, links: &[String], parent: &CrawlTask) -> usize {
        let mut enqueued = 0;

        for link in links {
            if !self.filter.should_crawl(link) {
                continue;
            }
            if self.dedup.has_seen(link).await {
                continue;
            }

            let parsed = match Url::parse(link) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping malformed link {}: {}", link, e);
                    continue;
                }
            };

            let priority = if domain_of(&parsed).contains(parent.domain.as_str()) {
                Priority::Medium
            } else {
                Priority::Low
            };

            self.frontier
                .add(CrawlTask::new(&parsed, priority, parent.depth + 1))
                .await;
            enqueued += 1;
        }

        enqueued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchError, MockFetcher};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(max_depth: u32) -> CrawlerConfig {
        let mut config = CrawlerConfig::default();
        config.crawler.max_depth = max_depth;
        config.crawler.politeness_delay = 0;
        config.http.fetch_timeout = 5;
        config.http.robots_timeout = 5;
        config
    }

    fn local_robots() -> RobotsCache {
        RobotsCache::new("WebCrawler/1.0", Duration::from_secs(5))
            .unwrap()
            .with_schemes(&["http"])
    }

    fn html(title: &str, text: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>", href))
            .collect();
        format!(
            "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
            title, text, anchors
        )
    }

    async fn mount_page(server: &MockServer, route: &str, body: String, hits: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(hits)
            .mount(server)
            .await;
    }

    async fn mount_robots(server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn local_controller(max_depth: u32) -> CrawlerController {
        let filter = UrlFilter::new(vec!["127.0.0.1".to_string()]);
        CrawlerController::new(test_config(max_depth))
            .unwrap()
            .with_robots(local_robots())
            .with_filter(Arc::new(filter))
    }

    #[tokio::test]
    async fn test_depth_limit_marks_but_never_fetches() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_robots(&server, "User-agent: *\nAllow: /\n").await;

        mount_page(&server, "/", html("root", "root page", &["/a"]), 1).await;
        mount_page(&server, "/a", html("a", "page a", &["/a/b"]), 1).await;
        mount_page(&server, "/a/b", html("b", "page b", &[]), 0).await;

        let mut crawler = local_controller(1);
        crawler.add_seed(&format!("{}/", base), Priority::High).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(crawler.state(), CrawlState::Done);
        assert_eq!(stats.pages_crawled, 2);
        assert_eq!(stats.skipped(SkipReason::DepthExceeded), 1);
        assert!(crawler.dedup().has_seen(&format!("{}/a/b", base)).await);
        assert!(crawler.frontier().is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_content_contributes_no_links() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_robots(&server, "").await;

        mount_page(&server, "/", html("root", "root", &["/one", "/two"]), 1).await;
        mount_page(&server, "/one", html("one", "same text", &["/from-one"]), 1).await;
        mount_page(&server, "/two", html("two", "same text", &["/from-two"]), 1).await;
        // equal-priority pops are unordered, so either twin may be the original
        for route in ["/from-one", "/from-two"] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_string(html("x", route, &[])))
                .mount(&server)
                .await;
        }

        let mut crawler = local_controller(5);
        crawler.add_seed(&format!("{}/", base), Priority::High).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(stats.pages_crawled, 3);
        assert_eq!(stats.skipped(SkipReason::DuplicateContent), 1);
        assert_eq!(crawler.frontier().domain_count(&domain_of(&Url::parse(&base).unwrap())).await, 4);
    }

    async fn delay_after_page(base_delay_ms: u64, robots: &str) -> Option<Duration> {
        let server = MockServer::start().await;
        mount_robots(&server, robots).await;
        mount_page(&server, "/", html("root", "root", &[]), 1).await;

        let mut config = test_config(3);
        config.crawler.politeness_delay = base_delay_ms;
        let crawler = CrawlerController::new(config)
            .unwrap()
            .with_robots(local_robots())
            .with_filter(Arc::new(UrlFilter::new(vec!["127.0.0.1".to_string()])));

        let seed = Url::parse(&format!("{}/", server.uri())).unwrap();
        crawler.process_task(CrawlTask::new(&seed, Priority::High, 0)).await
    }

    #[tokio::test]
    async fn test_base_delay_wins_over_shorter_crawl_delay() {
        let delay = delay_after_page(1500, "User-agent: *\nCrawl-delay: 1\n").await;
        assert_eq!(delay, Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn test_crawl_delay_wins_over_shorter_base_delay() {
        let delay = delay_after_page(500, "User-agent: *\nCrawl-delay: 2\n").await;
        assert_eq!(delay, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_effective_delay_is_the_maximum() {
        let mut config = test_config(3);
        config.crawler.politeness_delay = 1000;
        let crawler = CrawlerController::new(config).unwrap();

        assert_eq!(crawler.effective_delay(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(crawler.effective_delay(Duration::from_secs(3)), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_robots_disallow_skips_fetch() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_robots(&server, "User-agent: *\nDisallow: /private\n").await;

        mount_page(&server, "/", html("root", "root", &["/private/x", "/public"]), 1).await;
        mount_page(&server, "/private/x", html("p", "secret", &[]), 0).await;
        mount_page(&server, "/public", html("q", "public", &[]), 1).await;

        let mut crawler = local_controller(3);
        crawler.add_seed(&format!("{}/", base), Priority::High).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(stats.pages_crawled, 2);
        assert_eq!(stats.skipped(SkipReason::RobotsDisallowed), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_fatal() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_robots(&server, "").await;

        mount_page(&server, "/", html("root", "root", &["/missing", "/ok"]), 1).await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        mount_page(&server, "/ok", html("ok", "ok", &[]), 1).await;

        let mut crawler = local_controller(3);
        crawler.add_seed(&format!("{}/", base), Priority::High).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(stats.pages_crawled, 2);
        assert_eq!(stats.skipped(SkipReason::FetchFailed), 1);
        assert_eq!(crawler.state(), CrawlState::Done);
    }

    #[tokio::test]
    async fn test_seen_urls_are_dropped_at_pop() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_robots(&server, "").await;
        mount_page(&server, "/", html("root", "root", &[]), 1).await;

        let mut crawler = local_controller(3);
        let seed = format!("{}/", base);
        crawler.add_seed(&seed, Priority::High).await.unwrap();
        crawler.add_seed(&seed, Priority::Low).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(stats.pages_crawled, 1);
        assert_eq!(stats.skipped(SkipReason::AlreadySeen), 1);
    }

    #[tokio::test]
    async fn test_discovered_link_priorities() {
        let crawler = CrawlerController::new(test_config(3))
            .unwrap()
            .with_filter(Arc::new(UrlFilter::new(vec![])));

        let task = CrawlTask::new(&Url::parse("https://example.com/").unwrap(), Priority::High, 0);
        let enqueued = crawler.enqueue_links(
            &[
                "https://blog.example.com/post".to_string(),
                "https://partner.org/page".to_string(),
                "https://example.com/photo.jpg".to_string(),
            ],
            &task,
        )
        .await;
        assert_eq!(enqueued, 2);

        let first = crawler.frontier().next().await.unwrap();
        assert_eq!(first.url, "https://blog.example.com/post");
        assert_eq!(first.priority, Priority::Medium);
        assert_eq!(first.depth, 1);

        let second = crawler.frontier().next().await.unwrap();
        assert_eq!(second.url, "https://partner.org/page");
        assert_eq!(second.priority, Priority::Low);
    }

    #[tokio::test]
    async fn test_mock_fetch_error_discards_task() {
        let server = MockServer::start().await;
        mount_robots(&server, "").await;
        let url = format!("{}/page", server.uri());

        let mut fetcher = MockFetcher::new();
        fetcher.expect_get().times(1).returning(|url| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            })
        });

        let mut crawler = local_controller(3).with_fetcher(Arc::new(fetcher));
        crawler.add_seed(&url, Priority::Medium).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(stats.pages_crawled, 0);
        assert_eq!(stats.skipped(SkipReason::FetchFailed), 1);
        assert!(crawler.dedup().has_seen(&url).await);
    }

    #[tokio::test]
    async fn test_page_limit_stops_run() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount_robots(&server, "").await;
        mount_page(&server, "/", html("root", "root", &["/a", "/b"]), 1).await;

        let mut config = test_config(3);
        config.crawler.max_pages = 1;
        let mut crawler = CrawlerController::new(config)
            .unwrap()
            .with_robots(local_robots())
            .with_filter(Arc::new(UrlFilter::new(vec!["127.0.0.1".to_string()])));
        crawler.add_seed(&format!("{}/", base), Priority::High).await.unwrap();

        let stats = crawler.run().await;

        assert_eq!(stats.pages_crawled, 1);
        assert_eq!(crawler.frontier().len().await, 2);
        assert_eq!(crawler.state(), CrawlState::Done);
    }

    #[tokio::test]
    async fn test_seed_errors() {
        let crawler = CrawlerController::new(test_config(3))
            .unwrap()
            .with_filter(Arc::new(UrlFilter::new(vec!["example.com".to_string()])));

        assert!(matches!(
            crawler.add_seed("::not a url::", Priority::High).await,
            Err(CrawlError::InvalidSeed { .. })
        ));
        assert!(matches!(
            crawler.add_seed("https://other.org/", Priority::High).await,
            Err(CrawlError::FilteredSeed(_))
        ));
        assert!(crawler.frontier().is_empty().await);
        assert_eq!(crawler.state(), CrawlState::Idle);
    }

    #[test]
    fn test_invalid_dedup_settings_rejected() {
        let mut config = test_config(3);
        config.dedup.expected_urls = 0;
        assert!(matches!(
            CrawlerController::new(config),
            Err(CrawlError::Dedup(BloomError::ZeroCapacity))
        ));
    }
}
