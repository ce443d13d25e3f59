//! One sampling run: every monitored item in turn, then a single merge.
//!
//! Items are fetched strictly one after another with a pacing wait between
//! them. A failing item never stops the run; it is recorded as `0` and the
//! next item is sampled. That includes an item whose URL does not resolve.
//! Only a failure to persist the result fails the run.

use crate::acquisition::{Fetcher, PageSource, Pacer};
use crate::config::{MonitoredItem, WatchConfig};
use crate::error::WatchResult;
use crate::temporal::{MergeReport, RetentionStore};
use crate::types::{Reading, SampleOutcome, Snapshot};
use chrono::Utc;

/// How one item fared in a run.
#[derive(Debug, Clone)]
pub struct ItemResult {
    pub item: MonitoredItem,
    /// Resolved page URL; `None` when the item's target was not a valid URL.
    pub url: Option<String>,
    pub outcome: SampleOutcome,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot: Snapshot,
    pub items: Vec<ItemResult>,
    pub merge: MergeReport,
}

impl RunReport {
    pub fn failed_items(&self) -> usize {
        self.items.iter().filter(|r| r.outcome.is_failure()).count()
    }
}

/// Drives the fetcher over the configured items.
pub struct Pipeline<'a> {
    config: &'a WatchConfig,
    source: &'a dyn PageSource,
    pacer: &'a dyn Pacer,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a WatchConfig, source: &'a dyn PageSource, pacer: &'a dyn Pacer) -> Self {
        Self {
            config,
            source,
            pacer,
        }
    }

    /// Sample every item once and assemble the snapshot.
    ///
    /// The snapshot is stamped with the time sampling started. An item whose
    /// URL cannot be resolved is recorded as failed without being fetched.
    pub async fn sample_all(&self) -> (Snapshot, Vec<ItemResult>) {
        let started_at = Utc::now();
        let fetcher = Fetcher::new(self.source, &self.config.fetch);

        tracing::info!(
            "sampling {} item(s) on site '{}' via {}",
            self.config.items.len(),
            self.config.site,
            self.source.name()
        );

        let mut results = Vec::with_capacity(self.config.items.len());
        for (i, item) in self.config.items.iter().enumerate() {
            if i > 0 {
                self.pacer.pause(self.config.pace).await;
            }

            let (url, outcome) = match item.resolve_url(&self.config.base_url) {
                Ok(url) => {
                    let outcome = fetcher.sample(&url).await;
                    (Some(url), outcome)
                }
                Err(e) => (None, SampleOutcome::Failed(e.to_string())),
            };
            match &outcome {
                SampleOutcome::Counted(n) => tracing::info!("{}: {n}", item.name),
                SampleOutcome::NoSignal => {
                    tracing::info!("{}: no counter found, recording 0", item.name)
                }
                SampleOutcome::Failed(e) => {
                    tracing::warn!("{}: fetch failed, recording 0 ({e})", item.name)
                }
            }
            results.push(ItemResult {
                item: item.clone(),
                url,
                outcome,
            });
        }

        let readings = results
            .iter()
            .map(|r| Reading::new(&r.item.name, r.outcome.online_users()))
            .collect();

        (Snapshot::new(started_at, &self.config.site, readings), results)
    }

    /// Sample every item and merge the snapshot into `store`.
    pub async fn run(&self, store: &RetentionStore) -> WatchResult<RunReport> {
        let (snapshot, items) = self.sample_all().await;
        let merge = store.merge_and_persist_now(snapshot.clone())?;

        tracing::info!(
            "run complete: {} snapshot(s) kept, {} archived",
            merge.kept,
            merge.evicted
        );

        Ok(RunReport {
            snapshot,
            items,
            merge,
        })
    }
}
