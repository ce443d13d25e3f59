//! End-to-end runs of the sampling pipeline against scripted pages.
//!
//! No network: a fake page source answers by URL, pacing is skipped, and
//! every run writes into a temporary data directory.

use anyhow::anyhow;
use async_trait::async_trait;
use online_watch::acquisition::{NoPace, PageSource, RetryPolicy};
use online_watch::config::{MonitoredItem, WatchConfig};
use online_watch::temporal::{RetentionStore, LIVE_FILE_NAME};
use online_watch::types::{Reading, SampleOutcome};
use online_watch::Pipeline;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

// ─────────────────────── helpers ───────────────────────

/// Answers each URL from a per-URL queue of responses; the last response
/// repeats once the queue is down to one.
struct ScriptedSite {
    responses: Mutex<HashMap<String, Vec<Result<String, String>>>>,
    calls: AtomicUsize,
}

impl ScriptedSite {
    fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn page(self, url: &str, script: Vec<Result<&str, &str>>) -> Self {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            script
                .into_iter()
                .map(|r| r.map(String::from).map_err(String::from))
                .collect(),
        );
        self
    }
}

#[async_trait]
impl PageSource for ScriptedSite {
    async fn fetch_text(&self, url: &str, _timeout_ms: u64) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(url)
            .ok_or_else(|| anyhow!("connection refused: {url}"))?;
        let next = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        };
        next.map_err(|e| anyhow!(e))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn three_items() -> Vec<MonitoredItem> {
    vec![
        MonitoredItem::slug("Two Sum", "two-sum"),
        MonitoredItem::slug("Add Two Numbers", "add-two-numbers"),
        MonitoredItem::slug("Median of Two Sorted Arrays", "median-of-two-sorted-arrays"),
    ]
}

fn config_in(dir: &TempDir) -> WatchConfig {
    WatchConfig::for_site("us")
        .unwrap()
        .with_items(three_items())
        .with_data_dir(dir.path().join("data"))
}

const TWO_SUM: &str = "https://leetcode.com/problems/two-sum/";
const ADD_TWO: &str = "https://leetcode.com/problems/add-two-numbers/";
const MEDIAN: &str = "https://leetcode.com/problems/median-of-two-sorted-arrays/";

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_failed_item_recorded_as_zero() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let site = ScriptedSite::new()
        .page(TWO_SUM, vec![Ok("<div class='online'>1,234 online</div>")])
        .page(ADD_TWO, vec![Err("timed out after 120000ms")])
        .page(MEDIAN, vec![Ok("当前在线 56")]);
    let store = RetentionStore::new(&config.data_dir, config.retention);

    let report = Pipeline::new(&config, &site, &NoPace)
        .run(&store)
        .await
        .unwrap();

    assert_eq!(
        report.snapshot.problems,
        vec![
            Reading::new("Two Sum", 1234),
            Reading::new("Add Two Numbers", 0),
            Reading::new("Median of Two Sorted Arrays", 56),
        ]
    );
    assert!(matches!(report.items[1].outcome, SampleOutcome::Failed(_)));
    assert_eq!(report.failed_items(), 1);
    // One attempt each for the good pages, two for the failing one.
    assert_eq!(site.calls.load(Ordering::SeqCst), 4);

    let raw = std::fs::read_to_string(dir.path().join("data").join(LIVE_FILE_NAME)).unwrap();
    let on_disk: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(on_disk.as_array().unwrap().len(), 1);
    assert_eq!(on_disk[0]["site"], "us");
    assert_eq!(on_disk[0]["problems"][1]["online_users"], 0);
    assert_eq!(on_disk[0]["problems"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unrendered_page_retried_until_counter_shows() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let site = ScriptedSite::new()
        .page(TWO_SUM, vec![Ok("<div id='app'></div>"), Ok("42 online")])
        .page(ADD_TWO, vec![Ok("7 人")])
        .page(MEDIAN, vec![Ok("nothing to see")]);

    let (snapshot, items) = Pipeline::new(&config, &site, &NoPace)
        .sample_all()
        .await;

    assert_eq!(snapshot.problems[0].online_users, 42);
    assert_eq!(snapshot.problems[1].online_users, 7);
    assert_eq!(items[2].outcome, SampleOutcome::NoSignal);
    assert_eq!(snapshot.problems[2].online_users, 0);
}

#[tokio::test]
async fn test_transport_only_policy_takes_first_page() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.fetch.retry_policy = RetryPolicy::TransportOnly;
    let site = ScriptedSite::new()
        .page(TWO_SUM, vec![Ok("<div id='app'></div>"), Ok("42 online")])
        .page(ADD_TWO, vec![Ok("7 人")])
        .page(MEDIAN, vec![Ok("3 users")]);

    let (snapshot, items) = Pipeline::new(&config, &site, &NoPace)
        .sample_all()
        .await;

    assert_eq!(items[0].outcome, SampleOutcome::NoSignal);
    assert_eq!(snapshot.problems[0].online_users, 0);
    assert_eq!(site.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_corrupt_history_does_not_block_run() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    std::fs::create_dir_all(&config.data_dir).unwrap();
    std::fs::write(config.data_dir.join(LIVE_FILE_NAME), "not json at all").unwrap();

    let site = ScriptedSite::new()
        .page(TWO_SUM, vec![Ok("1 online")])
        .page(ADD_TWO, vec![Ok("2 online")])
        .page(MEDIAN, vec![Ok("3 online")]);
    let store = RetentionStore::new(&config.data_dir, config.retention);

    let report = Pipeline::new(&config, &site, &NoPace)
        .run(&store)
        .await
        .unwrap();

    assert_eq!(report.merge.kept, 1);
    assert_eq!(store.load(), vec![report.snapshot]);
}

#[tokio::test]
async fn test_repeated_runs_grow_history() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let site = ScriptedSite::new()
        .page(TWO_SUM, vec![Ok("1 online")])
        .page(ADD_TWO, vec![Ok("2 online")])
        .page(MEDIAN, vec![Ok("3 online")]);
    let store = RetentionStore::new(&config.data_dir, config.retention);
    let pipeline = Pipeline::new(&config, &site, &NoPace);

    pipeline.run(&store).await.unwrap();
    let second = pipeline.run(&store).await.unwrap();

    assert_eq!(second.merge.kept, 2);
    assert_eq!(store.load().len(), 2);
    assert!(second.merge.archive_path.is_none());
}
