//! Configuration loading and resolution.
//!
//! Everything a run needs is gathered into an immutable [`WatchConfig`] that
//! is handed to the pipeline. Values resolve as: explicit flag, then
//! environment variable, then built-in default.

use crate::acquisition::fetcher::{FetchOptions, RetryPolicy};
use crate::error::{WatchError, WatchResult};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Known sites: key → base URL.
pub const SITES: &[(&str, &str)] = &[
    ("us", "https://leetcode.com"),
    ("cn", "https://leetcode.cn"),
];

pub const DEFAULT_SITE: &str = "us";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_PACE_MS: u64 = 1_000;

/// Desktop Chrome identity sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36";

/// Where a monitored item lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemTarget {
    /// Absolute page URL.
    Url(String),
    /// Problem slug, resolved against the site's base URL.
    Slug(String),
}

/// One page tracked for a concurrently viewing count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItem {
    pub name: String,
    #[serde(flatten)]
    pub target: ItemTarget,
}

impl MonitoredItem {
    pub fn slug(name: &str, slug: &str) -> Self {
        Self {
            name: name.to_string(),
            target: ItemTarget::Slug(slug.to_string()),
        }
    }

    pub fn url(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            target: ItemTarget::Url(url.to_string()),
        }
    }

    /// Resolve the page URL for this item against `base_url`.
    pub fn resolve_url(&self, base_url: &str) -> WatchResult<String> {
        match &self.target {
            ItemTarget::Url(u) => Url::parse(u)
                .map(|u| u.to_string())
                .map_err(|e| invalid_url(u, e)),
            ItemTarget::Slug(slug) => {
                let base = Url::parse(base_url).map_err(|e| invalid_url(base_url, e))?;
                base.join(&format!("problems/{}/", slug.trim_matches('/')))
                    .map(|u| u.to_string())
                    .map_err(|e| invalid_url(slug, e))
            }
        }
    }
}

fn invalid_url(url: &str, e: url::ParseError) -> WatchError {
    WatchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

/// The built-in item list.
pub fn default_items() -> Vec<MonitoredItem> {
    vec![
        MonitoredItem::slug("Two Sum", "two-sum"),
        MonitoredItem::slug("Add Two Numbers", "add-two-numbers"),
        MonitoredItem::slug(
            "Longest Substring Without Repeating Characters",
            "longest-substring-without-repeating-characters",
        ),
        MonitoredItem::slug("Median of Two Sorted Arrays", "median-of-two-sorted-arrays"),
        MonitoredItem::slug("Longest Palindromic Substring", "longest-palindromic-substring"),
    ]
}

/// Look up a site's base URL.
pub fn site_base_url(site: &str) -> WatchResult<&'static str> {
    SITES
        .iter()
        .find(|(key, _)| *key == site)
        .map(|(_, base)| *base)
        .ok_or_else(|| WatchError::UnknownSite {
            site: site.to_string(),
            known: SITES
                .iter()
                .map(|(key, _)| *key)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Load an item list from a JSON file: `[{"name": .., "slug" | "url": ..}, ..]`.
pub fn load_items(path: &Path) -> WatchResult<Vec<MonitoredItem>> {
    let items_err = |reason: String| WatchError::ItemsFile {
        path: path.to_path_buf(),
        reason,
    };
    let data = std::fs::read_to_string(path).map_err(|e| items_err(e.to_string()))?;
    let items: Vec<MonitoredItem> =
        serde_json::from_str(&data).map_err(|e| items_err(e.to_string()))?;
    if items.is_empty() {
        return Err(items_err("no items listed".to_string()));
    }
    Ok(items)
}

/// Resolved settings for one sampling run.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub site: String,
    pub base_url: String,
    pub items: Vec<MonitoredItem>,
    /// Directory holding the live file and the dated archives.
    pub data_dir: PathBuf,
    pub retention: ChronoDuration,
    pub fetch: FetchOptions,
    /// Wait between consecutive items.
    pub pace: Duration,
}

impl WatchConfig {
    /// Defaults for `site`, with environment overrides applied.
    pub fn for_site(site: &str) -> WatchResult<Self> {
        let base_url = site_base_url(site)?;
        let data_dir = read_env_string("ONLINE_WATCH_DATA_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let defaults = FetchOptions::default();
        let fetch = FetchOptions {
            timeout_ms: read_env_u64("ONLINE_WATCH_TIMEOUT_MS", defaults.timeout_ms),
            max_attempts: read_env_u32("ONLINE_WATCH_MAX_ATTEMPTS", defaults.max_attempts).max(1),
            user_agent: read_env_string("ONLINE_WATCH_USER_AGENT")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.user_agent),
            retry_policy: RetryPolicy::UntilNonZero,
        };

        Ok(Self {
            site: site.to_string(),
            base_url: base_url.to_string(),
            items: default_items(),
            data_dir,
            retention: ChronoDuration::days(DEFAULT_RETENTION_DAYS),
            fetch,
            pace: Duration::from_millis(read_env_u64("ONLINE_WATCH_PACE_MS", DEFAULT_PACE_MS)),
        })
    }

    pub fn with_items(mut self, items: Vec<MonitoredItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_u32(name: &str, default_value: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default_value)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string())
}
