//! Snapshot history on disk.
//!
//! The live file holds the trailing retention window; snapshots that fall
//! out of it move to dated archive files.

pub mod store;

pub use store::{MergeReport, Partition, RetentionStore, LIVE_FILE_NAME};
