//! Sync parameters, validated once at construction.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ATTEMPTS, DEFAULT_PAGE_SIZE, DEFAULT_PROGRESS_EVERY, DEFAULT_RETRY_ROUNDS,
    DEFAULT_WORKERS,
};
use crate::errors::{DexError, Result};

/// Tuning knobs for a multi-run sync.
///
/// `validate` is called by the orchestrator before any work starts; invalid
/// parameters surface as [`DexError::Config`] instead of being absorbed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Worker pool size for the first run; later runs decay from here.
    pub workers: usize,
    /// Both the index page size and the main-pass batch size.
    pub batch_size: usize,
    /// Inter-batch sleep for the first run, in seconds.
    pub base_sleep_secs: f64,
    /// Re-sync entities that already exist locally.
    pub refresh_all: bool,
    /// Upper bound on full passes; the orchestrator never exceeds it.
    pub max_runs: u32,
    /// Stop once a run finishes with at most this many failed entities.
    pub target_fail: usize,
    /// Attempts per entity inside one worker call.
    pub attempts: u32,
    /// Smaller retry rounds appended to each pass.
    pub retry_rounds: u32,
    /// Emit an in-flight progress snapshot every N completions.
    pub progress_every: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_PAGE_SIZE,
            base_sleep_secs: 0.0,
            refresh_all: false,
            max_runs: 1,
            target_fail: 0,
            attempts: DEFAULT_ATTEMPTS,
            retry_rounds: DEFAULT_RETRY_ROUNDS,
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

impl SyncOptions {
    /// Reject parameter combinations that can never make progress.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(DexError::Config("workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(DexError::Config("batch_size must be at least 1".into()));
        }
        if self.attempts == 0 {
            return Err(DexError::Config("attempts must be at least 1".into()));
        }
        if self.max_runs == 0 {
            return Err(DexError::Config("max_runs must be at least 1".into()));
        }
        if !self.base_sleep_secs.is_finite() || self.base_sleep_secs < 0.0 {
            return Err(DexError::Config("base_sleep_secs must be non-negative".into()));
        }
        if self.progress_every == 0 {
            return Err(DexError::Config("progress_every must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SyncOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let opts = SyncOptions { workers: 0, ..SyncOptions::default() };
        assert!(matches!(opts.validate(), Err(DexError::Config(_))));
    }

    #[test]
    fn negative_sleep_rejected() {
        let opts = SyncOptions { base_sleep_secs: -1.0, ..SyncOptions::default() };
        assert!(matches!(opts.validate(), Err(DexError::Config(_))));
    }

    #[test]
    fn zero_max_runs_rejected() {
        let opts = SyncOptions { max_runs: 0, ..SyncOptions::default() };
        assert!(matches!(opts.validate(), Err(DexError::Config(_))));
    }
}
