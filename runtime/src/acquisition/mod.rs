//! Page acquisition: the fetch capability and the retrying fetcher.
//!
//! The pipeline never talks to a transport directly. It goes through the
//! [`PageSource`] trait, implemented by the plain HTTP client here and by the
//! headless browser in [`crate::renderer`], so retry and pacing logic can be
//! exercised against scripted fakes.

pub mod fetcher;
pub mod http_client;

use anyhow::Result;
use async_trait::async_trait;

pub use fetcher::{FetchOptions, Fetcher, NoPace, Pacer, RetryPolicy, SleepPacer};
pub use http_client::HttpClient;

/// Something that can fetch the text of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` and return its text, giving up after `timeout_ms`.
    ///
    /// Timeouts, connection errors and non-success statuses are all errors.
    async fn fetch_text(&self, url: &str, timeout_ms: u64) -> Result<String>;

    /// Short transport name for logs.
    fn name(&self) -> &'static str;
}
