// Copyright 2026 Online Watch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Online Watch: samples "concurrently viewing" counters from a set of pages
//! and keeps a rolling window of snapshots on disk.
//!
//! A run fetches each monitored item in turn ([`acquisition`]), pulls the
//! count out of the page text ([`extraction`]), and hands the resulting
//! snapshot to the retention store ([`temporal`]).

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod renderer;
pub mod temporal;
pub mod types;

pub use config::{MonitoredItem, WatchConfig};
pub use error::{WatchError, WatchResult};
pub use pipeline::{Pipeline, RunReport};
pub use temporal::RetentionStore;
pub use types::{Reading, SampleOutcome, Snapshot};
