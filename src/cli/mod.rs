pub mod commands;
pub mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::crawler::task::Priority;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Write logs to the default log file in the data directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    pub save_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from one or more seed URLs
    Crawl {
        /// Seed URLs to start crawling from
        #[arg(required = true)]
        urls: Vec<String>,

        /// Site profile to use (default configuration if omitted)
        #[arg(short, long)]
        profile: Option<String>,

        /// Maximum crawling depth
        #[arg(short, long)]
        depth: Option<u32>,

        /// Maximum number of pages to crawl
        #[arg(short, long)]
        limit: Option<u32>,

        /// Base delay between requests in milliseconds
        #[arg(long)]
        delay: Option<u64>,

        /// Restrict crawling to these domains (repeatable)
        #[arg(short, long = "allow")]
        allowed_domains: Vec<String>,

        /// Priority given to the seed URLs
        #[arg(long, default_value = "high")]
        priority: Priority,

        /// Track seen URLs exactly instead of with a Bloom filter
        #[arg(long)]
        exact: bool,

        /// Print the crawl statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration profiles
    Config {
        /// Profile name to manage
        #[arg(required = false)]
        profile: Option<String>,

        /// List all available profiles
        #[arg(short, long)]
        list: bool,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Crawl { urls, profile, depth, limit, delay, allowed_domains, priority, exact, json } => {
            info!("Starting crawl of {} seed(s)", urls.len());
            let overrides = commands::CrawlOverrides {
                depth,
                limit,
                delay,
                allowed_domains,
                exact,
            };
            commands::crawl(urls, profile, overrides, priority, json).await
        },
        Commands::Config { profile, list } => {
            if list {
                info!("Listing all configuration profiles");
                commands::list_profiles()
            } else if let Some(profile_name) = profile {
                info!("Managing configuration profile: {}", profile_name);
                commands::manage_profile(profile_name)
            } else {
                info!("Showing current configuration");
                commands::show_config()
            }
        },
    }
}
