//! Command-line interface definitions for blog_feed.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every argument is optional and can also be provided via environment
//! variables, so a scheduler can invoke the binary with no arguments at all.

use crate::config::{Config, ConfigError, load_config};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the blog_feed application.
///
/// Flags override values from the YAML config file, which in turn override
/// the built-in defaults.
///
/// # Examples
///
/// ```sh
/// # Defaults: scrape the built-in source and write ./feed.xml
/// blog_feed
///
/// # Custom output and feed size
/// blog_feed -o public/feed.xml --max-items 30
///
/// # Everything from a config file
/// blog_feed -c blog_feed.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "FEED_CONFIG")]
    pub config: Option<String>,

    /// Listing page to scrape
    #[arg(short, long, env = "FEED_SOURCE_URL")]
    pub source_url: Option<String>,

    /// Path the feed is written to (and read back from on the next run)
    #[arg(short, long, env = "RSS_OUTPUT_FILE")]
    pub output_path: Option<PathBuf>,

    /// Maximum number of items kept in the feed
    #[arg(long, env = "FEED_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Maximum number of article cards considered per run
    #[arg(long, env = "FEED_PER_RUN_CAP")]
    pub per_run_cap: Option<usize>,
}

impl Cli {
    /// Resolve the final configuration: defaults, then the config file, then
    /// flags and environment variables.
    pub async fn resolve_config(&self) -> Result<Config, ConfigError> {
        let base = match &self.config {
            Some(path) => load_config(path).await?,
            None => Config::default(),
        };
        Ok(self.apply_overrides(base))
    }

    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(source_url) = &self.source_url {
            config.source_url = source_url.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output_path = output_path.clone();
        }
        if let Some(max_items) = self.max_items {
            config.max_items = max_items;
        }
        if let Some(per_run_cap) = self.per_run_cap {
            config.per_run_cap = per_run_cap;
        }
        config
    }
}
