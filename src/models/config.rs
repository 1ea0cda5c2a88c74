//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
///
/// The `days_window` settings that share this file are read separately by
/// [`crate::config::resolve_days_window`], so a bad value there never
/// invalidates the rest of the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Crawl behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Upstream client settings
    #[serde(default)]
    pub arxiv: ArxivConfig,

    /// State and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config at {:?}. Using defaults.", path);
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("Config load failed from {:?}: {}. Using defaults.", path, e);
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.categories.is_empty() {
            return Err(AppError::validation("crawler.categories is empty"));
        }
        if let Some(blank) = self.crawler.categories.iter().find(|c| c.trim().is_empty()) {
            return Err(AppError::validation(format!(
                "crawler.categories contains a blank entry: {blank:?}"
            )));
        }
        if self.crawler.progress_interval == 0 {
            return Err(AppError::validation("crawler.progress_interval must be > 0"));
        }
        if self.arxiv.user_agent.trim().is_empty() {
            return Err(AppError::validation("arxiv.user_agent is empty"));
        }
        if self.arxiv.timeout_secs == 0 {
            return Err(AppError::validation("arxiv.timeout_secs must be > 0"));
        }
        if self.arxiv.page_size == 0 {
            return Err(AppError::validation("arxiv.page_size must be > 0"));
        }
        url::Url::parse(&self.arxiv.base_url)?;
        Ok(())
    }
}

/// Where the first window bound comes from when state is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Latest published timestamp, then last run time
    #[default]
    PublishedFirst,
    /// Whichever of the two is later
    Latest,
}

/// Crawl behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Top-level subject categories, queried in order
    #[serde(default = "defaults::categories")]
    pub categories: Vec<String>,

    /// Lookback in days when the config file sets none
    #[serde(default = "defaults::days_window")]
    pub default_days_window: u32,

    /// Window start precedence
    #[serde(default)]
    pub window_start: StartPolicy,

    /// Pause after a failed category, in seconds
    #[serde(default = "defaults::error_backoff")]
    pub error_backoff_secs: u64,

    /// Log progress every N new records per category
    #[serde(default = "defaults::progress_interval")]
    pub progress_interval: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            categories: defaults::categories(),
            default_days_window: defaults::days_window(),
            window_start: StartPolicy::default(),
            error_backoff_secs: defaults::error_backoff(),
            progress_interval: defaults::progress_interval(),
        }
    }
}

/// arXiv API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    /// Query endpoint
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Results requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Minimum delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Extra attempts for a failing page before giving up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            request_delay_ms: defaults::request_delay(),
            max_retries: defaults::max_retries(),
        }
    }
}

/// File locations, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the dated output tree
    #[serde(default = "defaults::archive_dir")]
    pub archive_dir: String,

    /// Last-run marker
    #[serde(default = "defaults::state_file")]
    pub state_file: String,

    /// Seen-ledger
    #[serde(default = "defaults::seen_file")]
    pub seen_file: String,
}

impl PathsConfig {
    pub fn archive_path(&self, root: &Path) -> PathBuf {
        root.join(&self.archive_dir)
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }

    pub fn seen_path(&self, root: &Path) -> PathBuf {
        root.join(&self.seen_file)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            archive_dir: defaults::archive_dir(),
            state_file: defaults::state_file(),
            seen_file: defaults::seen_file(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit GitHub Actions group markers; auto-detected when unset
    #[serde(default)]
    pub github_groups: Option<bool>,
}

mod defaults {
    // Crawler defaults
    pub fn categories() -> Vec<String> {
        [
            "cs", "math", "stat", "q-bio", "q-fin", "eess", "econ", "physics", "cond-mat",
            "hep-ph", "hep-th", "gr-qc", "astro-ph",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn days_window() -> u32 {
        1
    }
    pub fn error_backoff() -> u64 {
        5
    }
    pub fn progress_interval() -> usize {
        100
    }

    // arXiv client defaults
    pub fn base_url() -> String {
        "http://export.arxiv.org/api/query".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; harvester/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> usize {
        200
    }
    pub fn request_delay() -> u64 {
        3000
    }
    pub fn max_retries() -> u32 {
        5
    }

    // Path defaults
    pub fn archive_dir() -> String {
        "archive".into()
    }
    pub fn state_file() -> String {
        "archive/crawl_state.json".into()
    }
    pub fn seen_file() -> String {
        "archive/arxiv_seen.json".into()
    }
}
