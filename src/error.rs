use std::time::Duration;

use thiserror::Error;

use crate::source_reader::Source;

/// Failure of a single bounded fetch against one meter.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("timeout during receive data (no response within {0:?})")]
    Timeout(Duration),
    #[error("reader task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of a refresh cycle that did not fully succeed.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// One source failed. The snapshot was still published.
    #[error("{meter} meter failed, published partial snapshot: {error}")]
    Partial { meter: Source, error: FetchError },
    /// Both sources failed. The snapshot was left untouched.
    #[error("both meters failed (inverter: {inverter}; grid: {grid})")]
    Total {
        inverter: FetchError,
        grid: FetchError,
    },
}

impl RefreshError {
    /// Whether the cycle still published a snapshot.
    pub fn published(&self) -> bool {
        matches!(self, RefreshError::Partial { .. })
    }
}
