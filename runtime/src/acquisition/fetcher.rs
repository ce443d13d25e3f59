//! Retrying fetcher and pacing between items.
//!
//! Retries are driven by whether a usable reading came back, not only by
//! transport success: a page that loads without a visible counter is often
//! still rendering, so under [`RetryPolicy::UntilNonZero`] it earns another
//! attempt. The outcome kinds stay distinct either way (see
//! [`SampleOutcome`]).

use super::PageSource;
use crate::config::DEFAULT_USER_AGENT;
use crate::extraction;
use crate::types::SampleOutcome;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// When a successfully fetched page is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry only on transport failure; any fetched page is final.
    TransportOnly,
    /// Also retry when the page yields no count or a zero count.
    #[default]
    UntilNonZero,
}

impl FromStr for RetryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "transport-only" | "transport" => Ok(Self::TransportOnly),
            "until-non-zero" | "until-nonzero" | "nonzero" => Ok(Self::UntilNonZero),
            other => Err(format!(
                "unknown retry policy '{other}' (expected transport-only or until-non-zero)"
            )),
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportOnly => f.write_str("transport-only"),
            Self::UntilNonZero => f.write_str("until-non-zero"),
        }
    }
}

/// Per-request settings.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout_ms: u64,
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    pub retry_policy: RetryPolicy,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_policy: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A wait point between items. Swapped for [`NoPace`] in tests.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Sleeps for the requested delay.
pub struct SleepPacer;

#[async_trait]
impl Pacer for SleepPacer {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Skips every wait.
pub struct NoPace;

#[async_trait]
impl Pacer for NoPace {
    async fn pause(&self, _delay: Duration) {}
}

/// Fetches pages through a [`PageSource`] with bounded retries.
pub struct Fetcher<'a> {
    source: &'a dyn PageSource,
    options: &'a FetchOptions,
}

impl<'a> Fetcher<'a> {
    pub fn new(source: &'a dyn PageSource, options: &'a FetchOptions) -> Self {
        Self { source, options }
    }

    fn attempts(&self) -> u32 {
        self.options.max_attempts.max(1)
    }

    /// Fetch `url` and extract a count, retrying per the configured policy.
    ///
    /// When attempts run out, the best reading seen from a fetched page is
    /// returned; only if every attempt failed in transport is the result
    /// [`SampleOutcome::Failed`].
    pub async fn sample(&self, url: &str) -> SampleOutcome {
        let mut best: Option<SampleOutcome> = None;
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=self.attempts() {
            match self.source.fetch_text(url, self.options.timeout_ms).await {
                Err(e) => {
                    tracing::warn!(
                        "attempt {attempt} fetching {url} via {} failed: {e:#}",
                        self.source.name()
                    );
                    last_error = format!("{e:#}");
                }
                Ok(text) => {
                    let outcome = match extraction::extract(&text) {
                        Some(count) => SampleOutcome::Counted(count),
                        None => SampleOutcome::NoSignal,
                    };
                    if self.is_final(&outcome) {
                        return outcome;
                    }
                    tracing::debug!("attempt {attempt}: no usable reading from {url} ({outcome:?})");
                    best = Some(prefer(best, outcome));
                }
            }
        }

        best.unwrap_or(SampleOutcome::Failed(last_error))
    }

    fn is_final(&self, outcome: &SampleOutcome) -> bool {
        match self.options.retry_policy {
            RetryPolicy::TransportOnly => true,
            RetryPolicy::UntilNonZero => matches!(outcome, SampleOutcome::Counted(n) if *n > 0),
        }
    }
}

/// A genuine zero beats a page without any counter.
fn prefer(current: Option<SampleOutcome>, new: SampleOutcome) -> SampleOutcome {
    match current {
        Some(SampleOutcome::Counted(n)) => SampleOutcome::Counted(n),
        _ => new,
    }
}
