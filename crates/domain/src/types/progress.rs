//! Progress snapshots and pass/run summaries.

use serde::{Deserialize, Serialize};

/// Which stage of a pass a progress snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "phase", content = "round")]
pub enum SyncPhase {
    /// Index enumeration (paging the listing endpoint).
    Index,
    /// The main parallel pass over the target IDs.
    Sync,
    /// A bounded retry round over the IDs the main pass left behind.
    Retry(u32),
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Sync => write!(f, "sync"),
            Self::Retry(round) => write!(f, "retry-{round}"),
        }
    }
}

/// One progress snapshot emitted by the sync engine.
///
/// `ok` is optimistic while a batch is in flight; snapshots emitted at batch
/// boundaries carry counts reconciled against the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub phase: SyncPhase,
    pub total: usize,
    pub done: usize,
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub batch: usize,
    pub batches: usize,
    /// Entities per second since the pass started.
    pub rate: f64,
    /// Estimated seconds remaining at the current rate (0 when unknown).
    pub eta_secs: f64,
}

/// Result of one full pass (index, select, main pass, retry rounds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub ok: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
    pub elapsed_secs: f64,
}

/// Aggregate outcome of a multi-run orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub runs: u32,
    pub total_ok: usize,
    pub total_skipped: usize,
    pub last_failed: usize,
}
