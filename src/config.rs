//! Run configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! command-line flags and environment variables (see [`crate::cli::Cli`]).
//! Every field has a default so the binary runs with no arguments at all.
//!
//! # Example `blog_feed.yaml`
//!
//! ```yaml
//! source_url: https://developers.googleblog.com/en/search/
//! output_path: public/feed.xml
//! max_items: 20
//! per_run_cap: 10
//! feed:
//!   title: Google Developers Search Blog
//!   self_url: https://example.github.io/blog-feed/feed.xml
//! fetch:
//!   timeout_secs: 10
//!   max_attempts: 3
//! ```

use crate::fetcher::RetryPolicy;
use crate::models::FeedMetadata;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

const DEFAULT_SOURCE_URL: &str = "https://developers.googleblog.com/en/search/";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid URL for `{field}`: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("`{0}` must be at least 1")]
    ZeroLimit(&'static str),
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The listing page to scrape.
    pub source_url: String,
    /// Origin that relative article links are resolved against. Defaults to
    /// the origin of `source_url`.
    pub site_origin: Option<String>,
    /// Where the feed is written, and read back from on the next run.
    pub output_path: PathBuf,
    /// Maximum number of items kept in the feed.
    pub max_items: usize,
    /// Maximum number of candidate cards considered per extraction.
    pub per_run_cap: usize,
    pub feed: FeedSettings,
    pub fetch: FetchSettings,
}

/// Channel metadata written into every feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub title: String,
    pub description: String,
    /// Canonical site link; defaults to `source_url`.
    pub link: Option<String>,
    pub language: String,
    pub self_url: Option<String>,
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub max_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            site_origin: None,
            output_path: PathBuf::from("feed.xml"),
            max_items: 20,
            per_run_cap: 10,
            feed: FeedSettings::default(),
            fetch: FetchSettings::default(),
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            title: "Google Developers Search Blog".to_string(),
            description: "Latest updates from Google Developers Search team".to_string(),
            link: None,
            language: "en-us".to_string(),
            self_url: None,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            max_backoff_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Check limits and URLs before any network or disk I/O happens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_items == 0 {
            return Err(ConfigError::ZeroLimit("max_items"));
        }
        if self.per_run_cap == 0 {
            return Err(ConfigError::ZeroLimit("per_run_cap"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::ZeroLimit("fetch.max_attempts"));
        }
        self.source()?;
        self.origin()?;
        if let Some(link) = &self.feed.link {
            parse_http_url("feed.link", link)?;
        }
        if let Some(self_url) = &self.feed.self_url {
            parse_http_url("feed.self_url", self_url)?;
        }
        Ok(())
    }

    /// The listing page URL.
    pub fn source(&self) -> Result<Url, ConfigError> {
        parse_http_url("source_url", &self.source_url)
    }

    /// Base URL for resolving relative links found on the listing page.
    pub fn origin(&self) -> Result<Url, ConfigError> {
        match &self.site_origin {
            Some(origin) => parse_http_url("site_origin", origin),
            None => {
                let source = self.source()?;
                let origin = source.origin().ascii_serialization();
                parse_http_url("site_origin", &origin)
            }
        }
    }

    /// Channel metadata for the feed document.
    pub fn feed_metadata(&self) -> FeedMetadata {
        FeedMetadata {
            title: self.feed.title.clone(),
            description: self.feed.description.clone(),
            link: self
                .feed
                .link
                .clone()
                .unwrap_or_else(|| self.source_url.clone()),
            language: self.feed.language.clone(),
            self_url: self.feed.self_url.clone(),
        }
    }

    /// Retry policy for the listing page fetch.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch.max_attempts,
            base_delay: Duration::from_millis(self.fetch.backoff_base_ms),
            max_delay: Duration::from_millis(self.fetch.max_backoff_ms),
        }
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

/// Load a YAML config file. Missing keys fall back to their defaults.
#[instrument(level = "info")]
pub async fn load_config(path: &str) -> Result<Config, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_string(),
        source,
    })?;
    info!(path, "Loaded configuration");
    Ok(config)
}

fn parse_config(text: &str) -> Result<Config, serde_yaml::Error> {
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(text)
}
