//! CLI handler for `online-watch run [site]`: sample every item once and update the store.

use crate::acquisition::{HttpClient, RetryPolicy, SleepPacer};
use crate::cli::output;
use crate::config::{self, WatchConfig, DEFAULT_SITE};
use crate::pipeline::{Pipeline, RunReport};
use crate::renderer::ChromiumRenderer;
use crate::temporal::RetentionStore;
use crate::types::SampleOutcome;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Which transport fetches the pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Transport {
    /// Plain HTTP GET of the raw markup.
    #[default]
    Http,
    /// Headless Chromium, for counters that only appear after rendering.
    Chromium,
}

/// Flags accepted by the run command. `None` keeps the configured value.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub site: String,
    pub items_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub transport: Transport,
    pub timeout_ms: Option<u64>,
    pub attempts: Option<u32>,
    pub retry_policy: Option<RetryPolicy>,
    pub pace_ms: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            site: DEFAULT_SITE.to_string(),
            items_file: None,
            data_dir: None,
            transport: Transport::default(),
            timeout_ms: None,
            attempts: None,
            retry_policy: None,
            pace_ms: None,
        }
    }
}

/// Resolve the run configuration: flags over environment over defaults.
pub fn build_config(opts: &RunOptions) -> Result<WatchConfig> {
    let mut config = WatchConfig::for_site(&opts.site)?;

    if let Some(path) = &opts.items_file {
        config = config.with_items(config::load_items(path)?);
    }
    if let Some(dir) = &opts.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(ms) = opts.timeout_ms {
        config.fetch.timeout_ms = ms;
    }
    if let Some(n) = opts.attempts {
        config.fetch.max_attempts = n.max(1);
    }
    if let Some(policy) = opts.retry_policy {
        config.fetch.retry_policy = policy;
    }
    if let Some(ms) = opts.pace_ms {
        config.pace = Duration::from_millis(ms);
    }
    Ok(config)
}

/// Run the run command.
pub async fn run(opts: RunOptions) -> Result<()> {
    let config = build_config(&opts)?;
    let store = RetentionStore::new(&config.data_dir, config.retention);

    let report = match opts.transport {
        Transport::Http => {
            let client = HttpClient::new(config.fetch.timeout_ms, &config.fetch.user_agent)
                .context("failed to build HTTP client")?;
            Pipeline::new(&config, &client, &SleepPacer).run(&store).await?
        }
        Transport::Chromium => {
            let renderer = ChromiumRenderer::launch(&config.fetch.user_agent).await?;
            let result = Pipeline::new(&config, &renderer, &SleepPacer).run(&store).await;
            if let Err(e) = renderer.shutdown().await {
                tracing::warn!("{e:#}");
            }
            result?
        }
    };

    print_report(&report, &store);
    Ok(())
}

fn print_report(report: &RunReport, store: &RetentionStore) {
    if output::is_json() {
        output::print_json(&serde_json::json!({
            "snapshot": report.snapshot,
            "kept": report.merge.kept,
            "evicted": report.merge.evicted,
            "dropped": report.merge.dropped,
            "archive": report.merge.archive_path,
            "failed_items": report.failed_items(),
        }));
        return;
    }
    if output::is_quiet() {
        return;
    }

    println!("  {} @ {}\n", report.snapshot.site, report.snapshot.timestamp);
    for r in &report.items {
        let note = match &r.outcome {
            SampleOutcome::Counted(_) => String::new(),
            SampleOutcome::NoSignal => "  (no counter found)".to_string(),
            SampleOutcome::Failed(e) => format!("  (failed: {e})"),
        };
        println!("    {:<50} {:>8}{note}", r.item.name, r.outcome.online_users());
    }
    println!(
        "\n  Saved to {} ({} kept, {} archived)",
        store.live_path().display(),
        report.merge.kept,
        report.merge.evicted
    );
}
