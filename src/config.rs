//! Configuration loading and validation.
//!
//! Everything has a default, so an empty file (or no file at all plus a URL
//! on the command line) is a valid configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::poll::FeedSource;

/// Environment variable naming a config file when `--config` is not given.
pub const ENV_CONFIG_PATH: &str = "FULLTEXT_RSS_CONFIG";

/// Poll interval used when a feed is given on the command line without one.
pub const DEFAULT_INTERVAL_SECS: f64 = 60.0;

const DEFAULT_TIMEOUT_SECS: f64 = 20.0;

/// Longest accepted timeout or poll interval: one week.
const MAX_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Upper bound on a single request, connect through body.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Result<Duration> {
        seconds("http.timeout_secs", self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Elements kept in the extracted fragment.  Others are unwrapped.
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    /// Attributes kept on retained elements.
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub remove_empty_nodes: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tags: default_tags(),
            attributes: default_attributes(),
            remove_empty_nodes: false,
        }
    }
}

/// How extracted content is turned into output records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// One record carrying the whole content.
    #[default]
    Plain,
    /// One record per non-empty line.
    Line,
}

/// Decoration applied to every output record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub codec: CodecKind,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub add_field: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
}

impl FeedConfig {
    pub fn interval(&self) -> Result<Duration> {
        seconds("interval_secs", self.interval_secs)
            .with_context(|| format!("feed {}", self.url))
    }
}

/// A positive, finite number of seconds no larger than [`MAX_SECS`].
fn seconds(field: &str, secs: f64) -> Result<Duration> {
    if !(secs.is_finite() && secs > 0.0 && secs <= MAX_SECS) {
        bail!("{field} must be a number of seconds in (0, {MAX_SECS}], got {secs}");
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{field} = {secs}"))
}

fn default_timeout_secs() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_interval_secs() -> f64 {
    DEFAULT_INTERVAL_SECS
}

fn default_user_agent() -> String {
    format!(
        "{}/{} (+{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

fn default_tags() -> Vec<String> {
    ["div", "p", "img", "a"].map(String::from).to_vec()
}

fn default_attributes() -> Vec<String> {
    ["src", "href"].map(String::from).to_vec()
}

impl Config {
    /// Read and parse a TOML file.  Validation happens in [`Config::validate`]
    /// once command-line overrides have been applied.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Replace any configured feeds with a single one.
    pub fn set_single_feed(&mut self, url: String, interval_secs: f64) {
        self.feeds = vec![FeedConfig { url, interval_secs }];
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("no feeds configured: pass a feed URL or add a [[feeds]] table");
        }
        self.http.timeout()?;
        for feed in &self.feeds {
            if feed.url.trim().is_empty() {
                bail!("feed url must not be empty");
            }
            feed.interval()?;
        }
        Ok(())
    }

    pub fn feed_sources(&self) -> Result<Vec<FeedSource>> {
        self.feeds
            .iter()
            .map(|f| Ok(FeedSource::new(f.url.trim(), f.interval()?)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
