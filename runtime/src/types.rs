//! Core data types for readings and snapshots.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One monitored item sampled at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    /// Concurrently viewing count. `0` when nothing usable was extracted.
    #[serde(default)]
    pub online_users: u64,
    /// Fields this version does not know about, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reading {
    pub fn new(name: &str, online_users: u64) -> Self {
        Self {
            name: name.to_string(),
            online_users,
            extra: Map::new(),
        }
    }
}

/// One run's complete result, as stored in the live file and the archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// ISO-8601 timestamp taken when sampling started.
    ///
    /// Kept as text so that records with unreadable timestamps survive
    /// deserialization and can be dropped explicitly by the store.
    pub timestamp: String,
    /// Site key the run sampled. Older records may lack it.
    #[serde(default)]
    pub site: String,
    pub problems: Vec<Reading>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    /// Create a snapshot stamped with `started_at`.
    pub fn new(started_at: DateTime<Utc>, site: &str, problems: Vec<Reading>) -> Self {
        Self {
            timestamp: format_timestamp(started_at),
            site: site.to_string(),
            problems,
            extra: Map::new(),
        }
    }

    /// The snapshot's timestamp, or `None` if it cannot be parsed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// How sampling one item ended.
///
/// A fetched page with no recognizable counter and a genuine zero count are
/// different things; both are kept apart from transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// A counter was found on the page.
    Counted(u64),
    /// The page was fetched but no pattern matched.
    NoSignal,
    /// Every attempt failed at the transport level.
    Failed(String),
}

impl SampleOutcome {
    /// The value recorded in the snapshot for this outcome.
    pub fn online_users(&self) -> u64 {
        match self {
            Self::Counted(n) => *n,
            Self::NoSignal | Self::Failed(_) => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Format a timestamp the way snapshots store it (RFC 3339, UTC).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored ISO-8601 timestamp.
///
/// Accepts RFC 3339 with any offset, naive date-times (read as UTC) and bare
/// dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
