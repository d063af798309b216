use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use tracing::{info, debug, error};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CrawlerConfig {
    pub crawler: CrawlerSettings,
    pub dedup: DedupSettings,
    pub filter: FilterSettings,
    pub http: HttpSettings,
}

/// Crawler-specific settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CrawlerSettings {
    pub max_depth: u32,
    pub max_pages: u32,         // 0 means no limit
    pub politeness_delay: u64,  // Delay between requests in milliseconds
    pub allowed_domains: Vec<String>,
    pub url_patterns: UrlPatterns,
    pub user_agent: String,
}

/// URL pattern settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct UrlPatterns {
    pub exclude: Vec<String>,
}

/// Which URL-seen store to build
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UrlSeenStrategy {
    Exact,
    #[default]
    Bloom,
}

/// Deduplication settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DedupSettings {
    pub strategy: UrlSeenStrategy,
    pub expected_urls: usize,
    pub false_positive_rate: f64,
    pub max_exact: usize,
}

/// Static URL filter settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FilterSettings {
    pub blocked_domains: Vec<String>,
    pub blocked_extensions: Vec<String>,
}

/// HTTP client settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpSettings {
    pub fetch_timeout: u64,   // Seconds
    pub robots_timeout: u64,  // Seconds
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 0,
            politeness_delay: 1000,
            allowed_domains: vec![],
            url_patterns: UrlPatterns::default(),
            user_agent: "WebCrawler/1.0".to_string(),
        }
    }
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            strategy: UrlSeenStrategy::Bloom,
            expected_urls: 1_000_000,
            false_positive_rate: 0.01,
            max_exact: 1000,
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            blocked_domains: ["facebook.com", "twitter.com", "instagram.com"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            blocked_extensions: [".exe", ".zip", ".pdf", ".jpg", ".png", ".gif", ".mp4", ".avi", ".mov"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: 30,
            robots_timeout: 10,
        }
    }
}

impl CrawlerSettings {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay)
    }
}

impl HttpSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    pub fn robots_timeout(&self) -> Duration {
        Duration::from_secs(self.robots_timeout)
    }
}

impl CrawlerConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let mut path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "focused-crawler", "focused-crawler") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        // Create the sites directory if it doesn't exist
        path.push("sites");
        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        path.pop();
        path
    }

    /// Load the default configuration
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_dir().join("default.yaml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_as_default()?;
            Ok(config)
        }
    }

    /// Load a configuration profile
    pub fn load_profile(profile: &str) -> Result<Self> {
        let profile_path = Self::config_dir().join("sites").join(format!("{}.yaml", profile));

        if profile_path.exists() {
            Self::load_from_file(&profile_path)
        } else {
            anyhow::bail!("Profile '{}' not found", profile)
        }
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))
    }

    /// Parse configuration from YAML; missing fields take their defaults
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Save the configuration as the default
    pub fn save_as_default(&self) -> Result<()> {
        let config_path = Self::config_dir().join("default.yaml");
        self.save_to_file(&config_path)
    }

    /// Save the configuration as a profile
    pub fn save_as_profile(&self, profile: &str) -> Result<()> {
        let sites_dir = Self::config_dir().join("sites");
        let profile_path = sites_dir.join(format!("{}.yaml", profile));
        self.save_to_file(&profile_path)
    }

    /// Save the configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// List all available profiles
    pub fn list_profiles() -> Result<Vec<String>> {
        let sites_dir = Self::config_dir().join("sites");

        if !sites_dir.exists() {
            return Ok(vec![]);
        }

        let mut profiles = Vec::new();

        for entry in fs::read_dir(sites_dir)? {
            let path = entry?.path();

            if path.is_file() && path.extension().map_or(false, |ext| ext == "yaml") {
                if let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) {
                    profiles.push(name.to_string());
                }
            }
        }

        profiles.sort();
        Ok(profiles)
    }
}
