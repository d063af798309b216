use regex::Regex;
use url::Url;
use tracing::{debug, warn};

use crate::cli::config::{CrawlerSettings, FilterSettings};
use crate::crawler::task::domain_of;

/// Static allow/deny decision for a URL
pub trait Filter: Send + Sync {
    fn should_crawl(&self, url: &str) -> bool;
}

/// Filter on allowed domains, blocked domains, blocked extensions and exclude patterns
pub struct UrlFilter {
    /// Host must contain one of these (if empty, any domain is allowed)
    allowed_domains: Vec<String>,

    /// Host must contain none of these
    blocked_domains: Vec<String>,

    /// Path must not end with any of these (case-insensitive)
    blocked_extensions: Vec<String>,

    /// Compiled regex patterns for URL exclusion
    exclude_patterns: Vec<Regex>,
}

impl UrlFilter {
    /// Filter with the default block lists
    pub fn new(allowed_domains: Vec<String>) -> Self {
        Self::with_lists(allowed_domains, FilterSettings::default(), &[])
    }

    /// Build from configuration
    pub fn from_settings(crawler: &CrawlerSettings, filter: &FilterSettings) -> Self {
        Self::with_lists(
            crawler.allowed_domains.clone(),
            filter.clone(),
            &crawler.url_patterns.exclude,
        )
    }

    fn with_lists(allowed_domains: Vec<String>, filter: FilterSettings, exclude: &[String]) -> Self {
        let exclude_patterns = exclude
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Invalid exclude pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        Self {
            allowed_domains: allowed_domains.into_iter().map(|d| d.to_lowercase()).collect(),
            blocked_domains: filter
                .blocked_domains
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
            blocked_extensions: filter
                .blocked_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            exclude_patterns,
        }
    }
}

impl Filter for UrlFilter {
    fn should_crawl(&self, url: &str) -> bool {
        let parsed_url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping invalid URL {}: {}", url, e);
                return false;
            }
        };

        let host = domain_of(&parsed_url);

        if !self.allowed_domains.is_empty()
            && !self.allowed_domains.iter().any(|domain| host.contains(domain.as_str()))
        {
            debug!("Skipping URL from non-allowed domain: {}", host);
            return false;
        }

        if self.blocked_domains.iter().any(|blocked| host.contains(blocked.as_str())) {
            debug!("Skipping URL from blocked domain: {}", host);
            return false;
        }

        let path = parsed_url.path().to_lowercase();
        if self.blocked_extensions.iter().any(|ext| path.ends_with(ext.as_str())) {
            debug!("Skipping URL with blocked extension: {}", url);
            return false;
        }

        if self.exclude_patterns.iter().any(|pattern| pattern.is_match(url)) {
            debug!("Skipping URL matching exclusion pattern: {}", url);
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::UrlPatterns;

    fn create_test_filter() -> UrlFilter {
        UrlFilter::new(vec!["example.com".to_string()])
    }

    #[test]
    fn test_allowed_domain_is_substring_match() {
        let filter = create_test_filter();

        assert!(filter.should_crawl("https://example.com/page1"));
        assert!(filter.should_crawl("https://blog.example.com/post"));
        assert!(!filter.should_crawl("https://other-site.com/page"));
    }

    #[test]
    fn test_empty_allow_list_allows_any_domain() {
        let filter = UrlFilter::new(vec![]);
        assert!(filter.should_crawl("https://anything.org/"));
    }

    #[test]
    fn test_blocked_domains() {
        let filter = UrlFilter::new(vec![]);
        assert!(!filter.should_crawl("https://www.facebook.com/share"));
        assert!(!filter.should_crawl("https://twitter.com/someone"));
    }

    #[test]
    fn test_configured_domains_match_case_insensitively() {
        let crawler = CrawlerSettings {
            allowed_domains: vec!["Example.COM".to_string()],
            ..CrawlerSettings::default()
        };
        let filter_settings = FilterSettings {
            blocked_domains: vec!["Blog.Example.com".to_string()],
            ..FilterSettings::default()
        };
        let filter = UrlFilter::from_settings(&crawler, &filter_settings);

        assert!(filter.should_crawl("https://example.com/page"));
        assert!(!filter.should_crawl("https://blog.example.com/post"));
    }

    #[test]
    fn test_blocked_extensions() {
        let filter = create_test_filter();

        assert!(!filter.should_crawl("https://example.com/image.jpg"));
        assert!(!filter.should_crawl("https://example.com/Report.PDF"));
        assert!(filter.should_crawl("https://example.com/report.pdf.html"));
        assert!(filter.should_crawl("https://example.com/page?file=a.zip"));
    }

    #[test]
    fn test_invalid_url() {
        let filter = create_test_filter();
        assert!(!filter.should_crawl("not a url"));
        assert!(!filter.should_crawl("/relative/path"));
    }

    #[test]
    fn test_exclude_patterns_from_settings() {
        let crawler = CrawlerSettings {
            allowed_domains: vec!["example.com".to_string()],
            url_patterns: UrlPatterns {
                exclude: vec![r"/login".to_string(), "([".to_string()],
            },
            ..CrawlerSettings::default()
        };
        let filter = UrlFilter::from_settings(&crawler, &FilterSettings::default());

        assert!(!filter.should_crawl("https://example.com/login?next=/"));
        assert!(filter.should_crawl("https://example.com/logout"));
    }
}
