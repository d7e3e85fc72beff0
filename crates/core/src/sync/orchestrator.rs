//! Multi-run adaptive controller over the pass runner.

use std::time::Duration;

use dexsync_domain::{Result, SyncOptions, SyncReport};
use tracing::info;

use super::pass::{PassParams, PassRunner};
use super::ports::ProgressFn;

/// Repeats full passes until failures drop under the target or the run
/// budget is exhausted, easing off the upstream between runs: slightly
/// fewer workers roughly every two runs, slightly longer inter-batch
/// sleeps every run.
///
/// Never raises for non-convergence; callers inspect
/// [`SyncReport::last_failed`].
pub struct SyncOrchestrator {
    runner: PassRunner,
    options: SyncOptions,
    progress: Option<ProgressFn>,
}

impl SyncOrchestrator {
    /// Validates `options` up front; malformed parameters fail here, before
    /// any network or database work starts.
    pub fn new(runner: PassRunner, options: SyncOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { runner, options, progress: None })
    }

    /// Attach a progress callback forwarded to every pass.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Execute up to `max_runs` passes with adaptive throttling.
    pub async fn run(&self) -> Result<SyncReport> {
        let mut report =
            SyncReport { runs: 0, total_ok: 0, total_skipped: 0, last_failed: 0 };

        for run in 1..=self.options.max_runs {
            report.runs = run;
            let (workers, sleep_between_batches) = adaptive_params(&self.options, run);
            info!(
                run,
                max_runs = self.options.max_runs,
                workers,
                batch_size = self.options.batch_size,
                sleep_between_batches,
                refresh_all = self.options.refresh_all,
                "starting sync run"
            );

            let params = PassParams {
                workers,
                batch_size: self.options.batch_size,
                sleep_between_batches,
                attempts: self.options.attempts,
                retry_rounds: self.options.retry_rounds,
                refresh_all: self.options.refresh_all,
                progress_every: self.options.progress_every,
            };
            let summary = self.runner.run(&params, self.progress.clone()).await?;

            report.total_ok += summary.ok;
            report.total_skipped += summary.skipped;
            report.last_failed = summary.failed;

            info!(
                run,
                total = summary.total,
                ok = summary.ok,
                skipped = summary.skipped,
                failed = summary.failed,
                elapsed_secs = summary.elapsed_secs,
                "sync run finished"
            );

            if report.last_failed <= self.options.target_fail {
                break;
            }

            // Inter-run backoff, distinct from the inter-batch sleep.
            tokio::time::sleep(Duration::from_secs_f64(1.0 + 0.5 * f64::from(run))).await;
        }

        Ok(report)
    }
}

/// Run-specific knobs: `workers = max(1, base − (r−1)/2)`,
/// `sleep = base + 0.1·(r−1)`. `run` is 1-based.
fn adaptive_params(options: &SyncOptions, run: u32) -> (usize, f64) {
    let decay = ((run - 1) / 2) as usize;
    let workers = options.workers.saturating_sub(decay).max(1);
    let sleep = options.base_sleep_secs + 0.1 * f64::from(run - 1);
    (workers, sleep)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use dexsync_domain::DexError;

    use super::super::ports::{CatalogIndex, EntityIngestor, EntityStore};
    use super::*;

    struct FixedIndex(Vec<u32>);

    #[async_trait]
    impl CatalogIndex for FixedIndex {
        async fn total_count(&self) -> dexsync_domain::Result<u64> {
            Ok(self.0.len() as u64)
        }

        async fn index_ids(&self, _page_size: usize) -> dexsync_domain::Result<Vec<u32>> {
            Ok(self.0.clone())
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl EntityStore for EmptyStore {
        async fn existing_ids(&self, _ids: &[u32]) -> dexsync_domain::Result<HashSet<u32>> {
            Ok(HashSet::new())
        }
    }

    struct AlwaysFailing(AtomicU32);

    #[async_trait]
    impl EntityIngestor for AlwaysFailing {
        async fn upsert(&self, _id: u32) -> dexsync_domain::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(DexError::Transient(502))
        }
    }

    fn options(max_runs: u32) -> SyncOptions {
        SyncOptions {
            workers: 4,
            batch_size: 4,
            attempts: 1,
            retry_rounds: 1,
            max_runs,
            ..SyncOptions::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_even_when_upstream_never_succeeds() {
        let runner = PassRunner::new(
            Arc::new(FixedIndex((1..=8).collect())),
            Arc::new(EmptyStore),
            Arc::new(AlwaysFailing(AtomicU32::new(0))),
        );
        let orchestrator = SyncOrchestrator::new(runner, options(3)).unwrap();

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.runs, 3);
        assert_eq!(report.last_failed, 8);
        assert_eq!(report.total_ok, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_once_target_fail_is_met() {
        struct OkIngestor(Arc<std::sync::Mutex<HashSet<u32>>>);

        #[async_trait]
        impl EntityIngestor for OkIngestor {
            async fn upsert(&self, id: u32) -> dexsync_domain::Result<()> {
                self.0.lock().unwrap().insert(id);
                Ok(())
            }
        }

        struct SharedStore(Arc<std::sync::Mutex<HashSet<u32>>>);

        #[async_trait]
        impl EntityStore for SharedStore {
            async fn existing_ids(&self, ids: &[u32]) -> dexsync_domain::Result<HashSet<u32>> {
                let written = self.0.lock().unwrap();
                Ok(ids.iter().copied().filter(|id| written.contains(id)).collect())
            }
        }

        let written = Arc::new(std::sync::Mutex::new(HashSet::new()));
        let runner = PassRunner::new(
            Arc::new(FixedIndex((1..=5).collect())),
            Arc::new(SharedStore(Arc::clone(&written))),
            Arc::new(OkIngestor(Arc::clone(&written))),
        );
        let orchestrator = SyncOrchestrator::new(runner, options(5)).unwrap();

        let report = orchestrator.run().await.unwrap();

        assert_eq!(report.runs, 1);
        assert_eq!(report.total_ok, 5);
        assert_eq!(report.last_failed, 0);
    }

    #[test]
    fn invalid_options_fail_at_construction() {
        let runner = PassRunner::new(
            Arc::new(FixedIndex(vec![])),
            Arc::new(EmptyStore),
            Arc::new(AlwaysFailing(AtomicU32::new(0))),
        );
        let bad = SyncOptions { workers: 0, ..SyncOptions::default() };
        assert!(matches!(SyncOrchestrator::new(runner, bad), Err(DexError::Config(_))));
    }

    #[test]
    fn workers_decay_every_two_runs_and_sleep_grows() {
        let opts = SyncOptions { workers: 6, base_sleep_secs: 0.5, ..SyncOptions::default() };
        let (workers, sleep) = adaptive_params(&opts, 1);
        assert_eq!(workers, 6);
        assert!((sleep - 0.5).abs() < 1e-9);
        let (workers, sleep) = adaptive_params(&opts, 2);
        assert_eq!(workers, 6);
        assert!((sleep - 0.6).abs() < 1e-9);
        assert_eq!(adaptive_params(&opts, 3).0, 5);
        assert_eq!(adaptive_params(&opts, 5).0, 4);

        let tiny = SyncOptions { workers: 1, ..SyncOptions::default() };
        assert_eq!(adaptive_params(&tiny, 9).0, 1);
    }
}
