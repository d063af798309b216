use anyhow::{Result, Context};
use tracing::{info, warn};

use crate::cli::config::{CrawlerConfig, UrlSeenStrategy};
use crate::crawler::controller::CrawlerController;
use crate::crawler::task::Priority;
use crate::utils::metrics::CrawlStats;

/// Command line values that take precedence over the loaded configuration
#[derive(Debug, Default)]
pub struct CrawlOverrides {
    pub depth: Option<u32>,
    pub limit: Option<u32>,
    pub delay: Option<u64>,
    pub allowed_domains: Vec<String>,
    pub exact: bool,
}

impl CrawlOverrides {
    fn apply(self, config: &mut CrawlerConfig) {
        if let Some(d) = self.depth {
            config.crawler.max_depth = d;
        }
        if let Some(l) = self.limit {
            config.crawler.max_pages = l;
        }
        if let Some(ms) = self.delay {
            config.crawler.politeness_delay = ms;
        }
        if !self.allowed_domains.is_empty() {
            config.crawler.allowed_domains = self.allowed_domains;
        }
        if self.exact {
            config.dedup.strategy = UrlSeenStrategy::Exact;
        }
    }
}

/// Run a crawl from the given seeds and print a summary
pub async fn crawl(
    urls: Vec<String>,
    profile: Option<String>,
    overrides: CrawlOverrides,
    priority: Priority,
    json: bool,
) -> Result<()> {
    let mut config = match &profile {
        Some(name) => CrawlerConfig::load_profile(name)
            .context(format!("Failed to load profile: {}", name))?,
        None => CrawlerConfig::load_default()?,
    };
    overrides.apply(&mut config);

    let mut controller = CrawlerController::new(config)
        .context("Failed to initialize crawler")?;

    for url in &urls {
        controller.add_seed(url, priority).await
            .context(format!("Failed to add seed URL: {}", url))?;
    }

    let stats = controller.run().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&stats);
    }

    Ok(())
}

fn print_summary(stats: &CrawlStats) {
    println!("Run ID: {}", stats.run_id);
    println!("Pages Crawled: {}", stats.pages_crawled);
    println!("Links Discovered: {} ({} queued)", stats.links_discovered, stats.links_enqueued);
    println!("Bytes Downloaded: {}", stats.bytes_downloaded);
    println!("Average Fetch: {:.1} ms", stats.average_fetch_millis());
    println!("Duration: {:.2}s", stats.elapsed_seconds());

    if !stats.skipped.is_empty() {
        println!("Skipped:");
        for (reason, count) in &stats.skipped {
            println!("  - {}: {}", reason, count);
        }
    }
}

/// List all available configuration profiles
pub fn list_profiles() -> Result<()> {
    let profiles = CrawlerConfig::list_profiles()?;

    println!("Available configuration profiles:");
    for profile in profiles {
        println!("  - {}", profile);
    }

    Ok(())
}

/// Show a profile, creating it from defaults if it does not exist
pub fn manage_profile(profile_name: String) -> Result<()> {
    match CrawlerConfig::load_profile(&profile_name) {
        Ok(config) => {
            println!("Profile: {}", profile_name);
            println!("{}", serde_yaml::to_string(&config)?);
        },
        Err(_) => {
            warn!("Profile '{}' does not exist. Creating a default profile.", profile_name);
            CrawlerConfig::default().save_as_profile(&profile_name)?;
            info!("Created default profile: {}", profile_name);
            println!("Created default profile: {}", profile_name);
        }
    }

    Ok(())
}

/// Show the current configuration
pub fn show_config() -> Result<()> {
    let config = CrawlerConfig::load_default()?;
    println!("Current configuration:");
    println!("{}", serde_yaml::to_string(&config)?);

    Ok(())
}
