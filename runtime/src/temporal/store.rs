//! Retention store: the rolling window of snapshots on disk.
//!
//! Layout under the data directory:
//!
//! ```text
//! data/online_users.json                 live window, pretty JSON array
//! data/<YYYY-MM-DD>/online_users.json    snapshots evicted with that cutoff date
//! data/<YYYY-MM-DD>/online_users.1.json  used while the file above is damaged
//! ```
//!
//! Reads are tolerant: a missing or unreadable live file counts as empty and
//! malformed elements are skipped. Archives are read strictly and a damaged
//! one is left as it is. Writes are not tolerant: any failure to persist is
//! returned to the caller. The live file is only ever replaced by renaming a
//! fully written temporary file over it.

use crate::error::{WatchError, WatchResult};
use crate::types::Snapshot;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name shared by the live file and every archive file.
pub const LIVE_FILE_NAME: &str = "online_users.json";

/// What one merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Snapshots now in the live file.
    pub kept: usize,
    /// Snapshots moved to the archive by this merge.
    pub evicted: usize,
    /// Stored elements discarded as unreadable.
    pub dropped: usize,
    /// Archive written by this merge, if any.
    pub archive_path: Option<PathBuf>,
}

/// Snapshots split by the retention cutoff.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Timestamp parses and is at or after the cutoff.
    pub keep: Vec<Snapshot>,
    /// Timestamp parses and is before the cutoff.
    pub evict: Vec<Snapshot>,
    /// Timestamp does not parse. These go nowhere.
    pub unparseable: usize,
}

/// Sole reader and writer of the live file and its archives.
#[derive(Debug, Clone)]
pub struct RetentionStore {
    data_dir: PathBuf,
    window: Duration,
}

impl RetentionStore {
    /// Create a store rooted at `data_dir` keeping `window` of history.
    pub fn new(data_dir: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            data_dir: data_dir.into(),
            window,
        }
    }

    pub fn live_path(&self) -> PathBuf {
        self.data_dir.join(LIVE_FILE_NAME)
    }

    /// Archive file for snapshots evicted with the given cutoff.
    pub fn archive_path(&self, cutoff: DateTime<Utc>) -> PathBuf {
        self.data_dir
            .join(cutoff.format("%Y-%m-%d").to_string())
            .join(LIVE_FILE_NAME)
    }

    /// Read the live file, skipping anything unreadable.
    pub fn load(&self) -> Vec<Snapshot> {
        read_snapshots(&self.live_path()).0
    }

    /// Append `snapshot`, apply the retention window as of `now`, and persist.
    ///
    /// Evicted snapshots are merged into the archive for the cutoff date
    /// before the live file is replaced. An interrupted run can leave a
    /// snapshot in both places, never in neither; the archive merge does not
    /// add it twice. A damaged archive is never rewritten: the batch goes to
    /// a numbered side file for the same date instead.
    pub fn merge_and_persist(
        &self,
        snapshot: Snapshot,
        now: DateTime<Utc>,
    ) -> WatchResult<MergeReport> {
        let live_path = self.live_path();
        let (mut records, skipped) = read_snapshots(&live_path);
        records.push(snapshot);

        let cutoff = now - self.window;
        let Partition {
            keep,
            evict,
            unparseable,
        } = partition(records, cutoff);
        if unparseable > 0 {
            tracing::warn!("dropping {unparseable} snapshot(s) with unparseable timestamps");
        }

        let archive_path = if evict.is_empty() {
            None
        } else {
            let (path, added) = merge_archive(&self.archive_path(cutoff), &evict)?;
            tracing::info!(
                "archived {} snapshot(s) to {} ({added} new)",
                evict.len(),
                path.display()
            );
            Some(path)
        };

        write_atomic(&live_path, &keep)?;
        tracing::debug!(
            "live store {} now holds {} snapshot(s)",
            live_path.display(),
            keep.len()
        );

        Ok(MergeReport {
            kept: keep.len(),
            evicted: evict.len(),
            dropped: skipped + unparseable,
            archive_path,
        })
    }

    /// [`Self::merge_and_persist`] as of the current time.
    pub fn merge_and_persist_now(&self, snapshot: Snapshot) -> WatchResult<MergeReport> {
        self.merge_and_persist(snapshot, Utc::now())
    }
}

/// Split snapshots into those inside and outside the window starting at
/// `cutoff`. Order is preserved within each side.
pub fn partition(records: Vec<Snapshot>, cutoff: DateTime<Utc>) -> Partition {
    records.into_iter().fold(Partition::default(), |mut acc, snap| {
        match snap.parsed_timestamp() {
            Some(ts) if ts >= cutoff => acc.keep.push(snap),
            Some(_) => acc.evict.push(snap),
            None => acc.unparseable += 1,
        }
        acc
    })
}

/// Parse-or-skip read of a snapshot array.
///
/// Returns the readable snapshots and how many array elements were skipped.
/// A missing file, invalid JSON, or a top-level value that is not an array
/// all read as empty.
fn read_snapshots(path: &Path) -> (Vec<Snapshot>, usize) {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (Vec::new(), 0),
        Err(e) => {
            tracing::warn!("cannot read {}, treating as empty: {e}", path.display());
            return (Vec::new(), 0);
        }
    };

    let elements: Vec<Value> = match serde_json::from_str(&data) {
        Ok(elements) => elements,
        Err(e) => {
            tracing::warn!("{} is not a JSON array, treating as empty: {e}", path.display());
            return (Vec::new(), 0);
        }
    };

    let total = elements.len();
    let snapshots: Vec<Snapshot> = elements
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    let skipped = total - snapshots.len();
    if skipped > 0 {
        tracing::warn!("skipped {skipped} malformed element(s) in {}", path.display());
    }
    (snapshots, skipped)
}

/// Side files tried for one cutoff date before a merge gives up.
const MAX_ARCHIVE_SIDE_FILES: u32 = 99;

/// Add `evicted` to the archive for its cutoff date, keeping what is
/// already there. Returns the file written and how many snapshots were new.
///
/// Each snapshot already archived absorbs at most one evicted copy, so
/// identical snapshots from the live file are all kept while a re-eviction
/// after an interrupted run adds nothing.
fn merge_archive(primary: &Path, evicted: &[Snapshot]) -> WatchResult<(PathBuf, usize)> {
    let (path, mut archived) = writable_archive(primary)?;
    let before = archived.len();
    let mut absorbed = vec![false; before];
    for snap in evicted {
        match (0..before).find(|&i| !absorbed[i] && archived[i] == *snap) {
            Some(i) => absorbed[i] = true,
            None => archived.push(snap.clone()),
        }
    }
    write_atomic(&path, &archived)?;
    Ok((path, archived.len() - before))
}

/// The first archive file for this date that can be safely rewritten, with
/// its current contents: the primary file, else `online_users.<n>.json`.
fn writable_archive(primary: &Path) -> WatchResult<(PathBuf, Vec<Snapshot>)> {
    for n in 0..=MAX_ARCHIVE_SIDE_FILES {
        let path = if n == 0 {
            primary.to_path_buf()
        } else {
            side_archive_path(primary, n)
        };
        if let Some(existing) = read_archive(&path) {
            return Ok((path, existing));
        }
    }
    Err(WatchError::persist(
        primary,
        std::io::Error::other("no archive file for this date can be safely rewritten"),
    ))
}

fn side_archive_path(primary: &Path, n: u32) -> PathBuf {
    let stem = primary
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("online_users");
    primary.with_file_name(format!("{stem}.{n}.json"))
}

/// Strict read of an archive file. A missing file is empty; anything that
/// does not parse cleanly, element by element, is `None` and must not be
/// overwritten.
fn read_archive(path: &Path) -> Option<Vec<Snapshot>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Some(Vec::new()),
        Err(e) => {
            tracing::warn!("cannot read archive {}, leaving it untouched: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(archived) => Some(archived),
        Err(e) => {
            tracing::warn!("archive {} is damaged, leaving it untouched: {e}", path.display());
            None
        }
    }
}

/// Write `snapshots` to `path` through a temporary file and a rename.
pub fn write_atomic(path: &Path, snapshots: &[Snapshot]) -> WatchResult<()> {
    let tmp = stage_temp(path, snapshots)?;
    commit(&tmp, path)
}

/// Temporary file used while replacing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(LIVE_FILE_NAME);
    path.with_file_name(format!("{name}.tmp"))
}

/// Fully write and sync the temporary file next to `path`.
fn stage_temp(path: &Path, snapshots: &[Snapshot]) -> WatchResult<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| WatchError::persist(parent, e))?;
        }
    }

    let mut payload = serde_json::to_vec_pretty(snapshots)?;
    payload.push(b'\n');

    let tmp = temp_path(path);
    let mut file = std::fs::File::create(&tmp).map_err(|e| WatchError::persist(&tmp, e))?;
    file.write_all(&payload)
        .and_then(|()| file.sync_all())
        .map_err(|e| WatchError::persist(&tmp, e))?;
    Ok(tmp)
}

/// Atomically move the staged file over `path`.
fn commit(tmp: &Path, path: &Path) -> WatchResult<()> {
    std::fs::rename(tmp, path).map_err(|e| WatchError::persist(path, e))
}
