//! Outcome of a successful run.

use std::time::Duration;

use serde::Serialize;

use crate::config::Format;

/// Returned by a run that settled successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub url: String,
    pub format: Format,
    /// Batches handed to the processor (all of them succeeded).
    pub batches: u64,
    /// Records across all batches.
    pub records: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn elapsed_ms(&self) -> u64 {
        millis(self.elapsed)
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
