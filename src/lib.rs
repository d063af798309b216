//! Focused web crawler.
//!
//! Seeds are filtered and queued into a three-tier priority [`Frontier`]. The
//! [`CrawlerController`] pops tasks one at a time, drops URLs it has already seen,
//! checks robots.txt through a per-domain [`RobotsCache`], fetches and parses the
//! page, drops pages whose text it has seen before, and queues the page's links one
//! hop deeper. A single politeness delay is applied after every accepted page.
//!
//! ```rust,ignore
//! use focused_crawler::{CrawlerConfig, CrawlerController, Priority};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = CrawlerConfig::default();
//!     config.crawler.allowed_domains = vec!["example.com".to_string()];
//!
//!     let mut crawler = CrawlerController::new(config)?;
//!     crawler.add_seed("https://example.com/", Priority::High).await?;
//!     let stats = crawler.run().await;
//!     println!("Crawled {} pages", stats.pages_crawled);
//!     Ok(())
//! }
//! ```
//!
//! [`Frontier`]: storage::Frontier
//! [`RobotsCache`]: crawler::RobotsCache

pub mod cli;
pub mod crawler;
pub mod fetch;
pub mod storage;
pub mod utils;

pub use cli::config::CrawlerConfig;
pub use crawler::{CrawlError, CrawlState, CrawlerController, Priority};
pub use utils::metrics::CrawlStats;
