use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Crawl priority of a task. Only seeds may be `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Represents a unit of frontier work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTask {
    /// URL to crawl
    pub url: String,

    /// Queue this task is placed in
    pub priority: Priority,

    /// Current depth in the crawl tree (0 for seed URLs)
    pub depth: u32,

    /// Authority of the URL (host, plus port when one is given)
    pub domain: String,
}

impl CrawlTask {
    /// Build a task from an already parsed URL
    pub fn new(url: &Url, priority: Priority, depth: u32) -> Self {
        Self {
            url: url.to_string(),
            priority,
            depth,
            domain: domain_of(url),
        }
    }
}

/// Host of the URL with its explicit port, if any.
pub fn domain_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Result of parsing one fetched page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawledContent {
    /// URL the page was fetched from
    pub url: String,

    /// Page title (empty if none was found)
    pub title: String,

    /// Concatenated visible block-level text
    pub text_content: String,

    /// Absolute links discovered on the page, in document order
    pub links: Vec<String>,

    /// Timestamp when the page was parsed
    pub fetched_at: DateTime<Utc>,
}
