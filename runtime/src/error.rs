//! Error types for the sampling pipeline.
//!
//! Only configuration mistakes and persistence failures are represented here.
//! Transport failures and extraction misses are ordinary outcomes of a run
//! and are carried by [`crate::types::SampleOutcome`] instead.

use std::path::PathBuf;

/// All errors that can fail a run.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("Unknown site '{site}' (known sites: {known})")]
    UnknownSite { site: String, known: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Items file {path}: {reason}")]
    ItemsFile { path: PathBuf, reason: String },

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl WatchError {
    /// Wrap an I/O error raised while writing `path`.
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }
}

pub type WatchResult<T> = Result<T, WatchError>;
