//! Progress reporting helper shared by the pass runner.

use std::time::Instant;

use dexsync_domain::{ProgressUpdate, SyncPhase};

use super::ports::ProgressFn;

/// Counter set carried into each snapshot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Counts {
    pub total: usize,
    pub done: usize,
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub batch: usize,
    pub batches: usize,
}

/// Emits uniform [`ProgressUpdate`] snapshots and owns the pass clock.
pub(crate) struct ProgressReporter {
    callback: Option<ProgressFn>,
    started: Instant,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressFn>) -> Self {
        Self { callback, started: Instant::now() }
    }

    pub(crate) fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub(crate) fn emit(&self, phase: SyncPhase, counts: Counts) {
        let Some(callback) = &self.callback else { return };
        let (rate, eta_secs) = rate_eta(counts.total, counts.done, self.elapsed_secs());
        callback(ProgressUpdate {
            phase,
            total: counts.total,
            done: counts.done,
            ok: counts.ok,
            failed: counts.failed,
            skipped: counts.skipped,
            batch: counts.batch,
            batches: counts.batches,
            rate,
            eta_secs,
        });
    }
}

/// `rate = done / elapsed`, `eta = remaining / rate` (both 0 when undefined).
fn rate_eta(total: usize, done: usize, elapsed_secs: f64) -> (f64, f64) {
    let rate = if elapsed_secs > 0.0 { done as f64 / elapsed_secs } else { 0.0 };
    let remaining = total.saturating_sub(done);
    let eta = if rate > 0.0 { remaining as f64 / rate } else { 0.0 };
    (rate, eta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_and_eta_from_elapsed() {
        let (rate, eta) = rate_eta(100, 50, 10.0);
        assert!((rate - 5.0).abs() < f64::EPSILON);
        assert!((eta - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_rate_yields_zero_eta() {
        let (rate, eta) = rate_eta(100, 0, 10.0);
        assert_eq!(rate, 0.0);
        assert_eq!(eta, 0.0);
    }

    #[test]
    fn done_past_total_clamps_eta() {
        let (_, eta) = rate_eta(10, 12, 1.0);
        assert_eq!(eta, 0.0);
    }
}
