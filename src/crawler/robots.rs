use percent_encoding::percent_decode_str;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::crawler::task::domain_of;

/// Errors from a robots.txt lookup. Fetch failures are never errors.
#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL {0} has no host")]
    MissingHost(String),
}

/// Rules that apply to this crawler on one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsPolicy {
    pub user_agent: String,
    pub disallow: Vec<String>,
    pub allow: Vec<String>,
    pub crawl_delay: Duration,
}

impl RobotsPolicy {
    /// Allows everything, no delay
    pub fn permissive(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            disallow: Vec::new(),
            allow: Vec::new(),
            crawl_delay: Duration::ZERO,
        }
    }

    /// Parse a robots.txt body, keeping only sections for `*` or `user_agent`
    pub fn parse(text: &str, user_agent: &str) -> Self {
        let mut policy = Self::permissive(user_agent);
        let mut relevant = false;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    relevant = value == "*" || value.eq_ignore_ascii_case(user_agent);
                }
                "disallow" if relevant => policy.disallow.push(value.to_string()),
                "allow" if relevant => policy.allow.push(value.to_string()),
                "crawl-delay" if relevant => match value.parse::<u64>() {
                    Ok(secs) => policy.crawl_delay = Duration::from_secs(secs),
                    Err(_) => debug!("Ignoring malformed Crawl-delay '{}'", value),
                },
                _ => {}
            }
        }

        policy
    }

    /// Prefix evaluation where any matching Allow beats every Disallow
    pub fn is_allowed(&self, path: &str) -> bool {
        if self
            .allow
            .iter()
            .any(|allow| !allow.is_empty() && path.starts_with(allow.as_str()))
        {
            return true;
        }

        if self.disallow.iter().any(|disallow| disallow == "/") {
            return false;
        }

        !self
            .disallow
            .iter()
            .any(|disallow| !disallow.is_empty() && path.starts_with(disallow.as_str()))
    }
}

/// Per-domain robots.txt cache; entries never expire
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    schemes: Vec<String>,
    cache: RwLock<HashMap<String, Arc<RobotsPolicy>>>,
}

impl RobotsCache {
    /// Create a cache that fetches over https, then http, with the given timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            schemes: vec!["https".to_string(), "http".to_string()],
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Override the schemes tried, in order
    pub fn with_schemes(mut self, schemes: &[&str]) -> Self {
        self.schemes = schemes.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether `url` may be fetched, and the crawl delay its domain asks for
    pub async fn can_crawl(&self, url: &str) -> Result<(bool, Duration), RobotsError> {
        let parsed = Url::parse(url).map_err(|source| RobotsError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if parsed.host_str().is_none() {
            return Err(RobotsError::MissingHost(url.to_string()));
        }

        let domain = domain_of(&parsed);
        let policy = self.policy_for(&domain).await;

        // rules are written unescaped, so match against the decoded path
        let path = percent_decode_str(parsed.path()).decode_utf8_lossy();

        Ok((policy.is_allowed(&path), policy.crawl_delay))
    }

    /// Number of domains with a cached policy
    pub async fn cached_domains(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn policy_for(&self, domain: &str) -> Arc<RobotsPolicy> {
        if let Some(policy) = self.cache.read().await.get(domain) {
            return Arc::clone(policy);
        }

        let policy = Arc::new(self.fetch_policy(domain).await);

        let mut cache = self.cache.write().await;
        Arc::clone(cache.entry(domain.to_string()).or_insert(policy))
    }

    async fn fetch_policy(&self, domain: &str) -> RobotsPolicy {
        for scheme in &self.schemes {
            let robots_url = format!("{}://{}/robots.txt", scheme, domain);
            info!("Fetching robots.txt from: {}", robots_url);

            let response = match self.client.get(&robots_url).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Error fetching {}: {}", robots_url, e);
                    continue;
                }
            };

            if !response.status().is_success() {
                debug!("No robots.txt for {} (HTTP {})", domain, response.status());
                return RobotsPolicy::permissive(&self.user_agent);
            }

            match response.text().await {
                Ok(text) => return RobotsPolicy::parse(&text, &self.user_agent),
                Err(e) => warn!("Failed to read {}: {}", robots_url, e),
            }
        }

        warn!("robots.txt unreachable for {}, allowing all paths", domain);
        RobotsPolicy::permissive(&self.user_agent)
    }
}
