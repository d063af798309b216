pub mod controller;
pub mod robots;
pub mod scheduler;
pub mod task;

// Re-export common types
pub use controller::{CrawlError, CrawlState, CrawlerController};
pub use robots::{RobotsCache, RobotsError, RobotsPolicy};
pub use scheduler::{Filter, UrlFilter};
pub use task::{CrawlTask, CrawledContent, Priority};
