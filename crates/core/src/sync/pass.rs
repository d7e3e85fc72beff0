//! One full synchronization pass: index, select, main pass, retry rounds.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dexsync_domain::{PassSummary, Result, SyncPhase};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::ports::{CatalogIndex, EntityIngestor, EntityStore, ProgressFn};
use super::progress::{Counts, ProgressReporter};
use super::worker::RetryWorker;

/// Per-pass parameters, derived by the orchestrator for each run.
#[derive(Debug, Clone)]
pub struct PassParams {
    pub workers: usize,
    pub batch_size: usize,
    pub sleep_between_batches: f64,
    pub attempts: u32,
    pub retry_rounds: u32,
    pub refresh_all: bool,
    pub progress_every: usize,
}

/// Executes one pass over the whole catalog.
///
/// The pass never fails for per-ID errors; those are absorbed by the retry
/// worker and aggregated into the summary. Only index enumeration and store
/// queries propagate errors.
pub struct PassRunner {
    index: Arc<dyn CatalogIndex>,
    store: Arc<dyn EntityStore>,
    ingestor: Arc<dyn EntityIngestor>,
}

impl PassRunner {
    pub fn new(
        index: Arc<dyn CatalogIndex>,
        store: Arc<dyn EntityStore>,
        ingestor: Arc<dyn EntityIngestor>,
    ) -> Self {
        Self { index, store, ingestor }
    }

    /// Run the pass and return authoritative counts.
    pub async fn run(
        &self,
        params: &PassParams,
        progress: Option<ProgressFn>,
    ) -> Result<PassSummary> {
        let reporter = ProgressReporter::new(progress);

        // Indexing: materialize the full ID universe.
        let all_ids = self.index.index_ids(params.batch_size).await?;
        let total = all_ids.len();
        reporter.emit(
            SyncPhase::Index,
            Counts { total, done: total, ok: 0, failed: 0, skipped: 0, batch: 0, batches: 0 },
        );
        if all_ids.is_empty() {
            return Ok(PassSummary { ok: 0, skipped: 0, failed: 0, total: 0, elapsed_secs: 0.0 });
        }

        // Selecting: skip IDs that already exist unless a full refresh was asked for.
        let targets = if params.refresh_all {
            all_ids.clone()
        } else {
            let existing = self.store.existing_ids(&all_ids).await?;
            all_ids.iter().copied().filter(|id| !existing.contains(id)).collect()
        };
        let skipped = total - targets.len();
        debug!(total, targets = targets.len(), skipped, "selected sync targets");

        if targets.is_empty() {
            return Ok(PassSummary {
                ok: 0,
                skipped,
                failed: 0,
                total,
                elapsed_secs: reporter.elapsed_secs(),
            });
        }

        let mut failed_ids = self.main_pass(&targets, params, skipped, &reporter).await?;

        for round in 1..=params.retry_rounds {
            if failed_ids.is_empty() {
                break;
            }
            failed_ids = self.retry_round(round, failed_ids, params, skipped, &reporter).await?;
        }

        let failed = failed_ids.len();
        let summary = PassSummary {
            ok: targets.len() - failed,
            skipped,
            failed,
            total,
            elapsed_secs: reporter.elapsed_secs(),
        };
        info!(
            ok = summary.ok,
            skipped = summary.skipped,
            failed = summary.failed,
            total = summary.total,
            "pass finished"
        );
        Ok(summary)
    }

    /// Main parallel pass over `targets`, batch by batch.
    ///
    /// Returns the pass-wide authoritative failed-ID list: after each batch
    /// the store is queried for exactly that batch's IDs and the complement
    /// supersedes the optimistic in-flight counts.
    async fn main_pass(
        &self,
        targets: &[u32],
        params: &PassParams,
        skipped: usize,
        reporter: &ProgressReporter,
    ) -> Result<Vec<u32>> {
        let worker = RetryWorker::new(Arc::clone(&self.ingestor), params.attempts);
        let batches = targets.len().div_ceil(params.batch_size);

        let mut done = 0;
        let mut ok = 0;
        let mut failed_ids: Vec<u32> = Vec::new();

        for (batch_idx, chunk) in targets.chunks(params.batch_size).enumerate() {
            // Bounded worker pool for this batch; the pool is torn down at the
            // batch boundary so batch N+1 never starts before N is reconciled.
            let mut optimistic = 0;
            {
                let mut outcomes = stream::iter(chunk.iter().copied())
                    .map(|id| worker.run(id))
                    .buffer_unordered(params.workers.max(1));

                while let Some(outcome) = outcomes.next().await {
                    if outcome.ok {
                        optimistic += 1;
                    }
                    done += 1;
                    if done % params.progress_every == 0 {
                        reporter.emit(
                            SyncPhase::Sync,
                            Counts {
                                total: targets.len(),
                                done,
                                ok: ok + optimistic,
                                failed: failed_ids.len(),
                                skipped,
                                batch: batch_idx + 1,
                                batches,
                            },
                        );
                    }
                }
            }

            // Exact accounting of what still isn't in the store for this batch.
            let present = self.store.existing_ids(chunk).await?;
            let missing = missing_from(chunk, &present);
            ok += chunk.len() - missing.len();
            failed_ids.extend(missing);

            if params.sleep_between_batches > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(params.sleep_between_batches)).await;
            }

            reporter.emit(
                SyncPhase::Sync,
                Counts {
                    total: targets.len(),
                    done,
                    ok,
                    failed: failed_ids.len(),
                    skipped,
                    batch: batch_idx + 1,
                    batches,
                },
            );
        }

        Ok(failed_ids)
    }

    /// One smaller retry round over the current failed-ID list.
    async fn retry_round(
        &self,
        round: u32,
        retry_ids: Vec<u32>,
        params: &PassParams,
        skipped: usize,
        reporter: &ProgressReporter,
    ) -> Result<Vec<u32>> {
        let workers = (params.workers / 2).max(1);
        let attempts = (params.attempts / 2).max(1);
        let worker = RetryWorker::new(Arc::clone(&self.ingestor), attempts);

        debug!(round, ids = retry_ids.len(), workers, attempts, "starting retry round");

        {
            let mut outcomes = stream::iter(retry_ids.iter().copied())
                .map(|id| worker.run(id))
                .buffer_unordered(workers);
            while outcomes.next().await.is_some() {}
        }

        let present = self.store.existing_ids(&retry_ids).await?;
        let remaining = missing_from(&retry_ids, &present);

        reporter.emit(
            SyncPhase::Retry(round),
            Counts {
                total: retry_ids.len(),
                done: retry_ids.len(),
                ok: retry_ids.len() - remaining.len(),
                failed: remaining.len(),
                skipped,
                batch: round as usize,
                batches: params.retry_rounds as usize,
            },
        );

        Ok(remaining)
    }
}

/// Set difference used for batch reconciliation: the IDs not present in the
/// store are this batch's authoritative failures.
fn missing_from(ids: &[u32], present: &HashSet<u32>) -> Vec<u32> {
    ids.iter().copied().filter(|id| !present.contains(id)).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dexsync_domain::{DexError, ProgressUpdate};

    use super::*;

    /// In-memory universe + store shared by the mock ports.
    struct World {
        ids: Vec<u32>,
        written: Mutex<HashSet<u32>>,
        /// IDs that fail this many times before succeeding (u32::MAX = always).
        failures: Mutex<std::collections::HashMap<u32, u32>>,
    }

    impl World {
        fn new(ids: Vec<u32>) -> Arc<Self> {
            Arc::new(Self {
                ids,
                written: Mutex::new(HashSet::new()),
                failures: Mutex::new(std::collections::HashMap::new()),
            })
        }

        fn fail_times(self: &Arc<Self>, id: u32, times: u32) {
            self.failures.lock().unwrap().insert(id, times);
        }
    }

    struct WorldIndex(Arc<World>);

    #[async_trait]
    impl CatalogIndex for WorldIndex {
        async fn total_count(&self) -> dexsync_domain::Result<u64> {
            Ok(self.0.ids.len() as u64)
        }

        async fn index_ids(&self, _page_size: usize) -> dexsync_domain::Result<Vec<u32>> {
            Ok(self.0.ids.clone())
        }
    }

    struct WorldStore(Arc<World>);

    #[async_trait]
    impl EntityStore for WorldStore {
        async fn existing_ids(&self, ids: &[u32]) -> dexsync_domain::Result<HashSet<u32>> {
            let written = self.0.written.lock().unwrap();
            Ok(ids.iter().copied().filter(|id| written.contains(id)).collect())
        }
    }

    struct WorldIngestor {
        world: Arc<World>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntityIngestor for WorldIngestor {
        async fn upsert(&self, id: u32) -> dexsync_domain::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.world.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&id) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(DexError::Transient(503));
                }
            }
            drop(failures);
            self.world.written.lock().unwrap().insert(id);
            Ok(())
        }
    }

    fn runner_for(world: &Arc<World>) -> (PassRunner, Arc<WorldIngestor>) {
        let ingestor =
            Arc::new(WorldIngestor { world: Arc::clone(world), calls: AtomicUsize::new(0) });
        let runner = PassRunner::new(
            Arc::new(WorldIndex(Arc::clone(world))),
            Arc::new(WorldStore(Arc::clone(world))),
            Arc::clone(&ingestor) as Arc<dyn EntityIngestor>,
        );
        (runner, ingestor)
    }

    fn params(workers: usize, batch_size: usize, attempts: u32) -> PassParams {
        PassParams {
            workers,
            batch_size,
            sleep_between_batches: 0.0,
            attempts,
            retry_rounds: 2,
            refresh_all: false,
            progress_every: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flaky_ids_recover_within_attempt_budget() {
        let world = World::new((1..=10).collect());
        world.fail_times(3, 3);
        world.fail_times(7, 3);
        let (runner, _) = runner_for(&world);

        let summary = runner.run(&params(4, 4, 4), None).await.unwrap();

        assert_eq!(summary.ok, 10);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.total, 10);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_survive_all_rounds() {
        let world = World::new((1..=10).collect());
        world.fail_times(2, u32::MAX);
        world.fail_times(9, u32::MAX);
        let (runner, _) = runner_for(&world);

        let summary = runner.run(&params(4, 5, 2), None).await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.ok, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_ids_are_skipped_unless_refreshing() {
        let world = World::new((1..=6).collect());
        world.written.lock().unwrap().extend([1, 2, 3]);
        let (runner, ingestor) = runner_for(&world);

        let summary = runner.run(&params(2, 10, 1), None).await.unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.ok, 3);
        assert_eq!(ingestor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_all_targets_every_id() {
        let world = World::new((1..=6).collect());
        world.written.lock().unwrap().extend([1, 2, 3]);
        let (runner, ingestor) = runner_for(&world);

        let mut p = params(2, 10, 1);
        p.refresh_all = true;
        let summary = runner.run(&p, None).await.unwrap();

        assert_eq!(summary.skipped, 0);
        assert_eq!(ingestor.calls.load(Ordering::SeqCst), 6);
        assert_eq!(summary.ok, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn reconciliation_trusts_the_store_over_worker_outcomes() {
        // An ingestor that reports failure but actually writes: the batch
        // reconciliation must count the ID as synced anyway.
        struct LyingIngestor(Arc<World>);

        #[async_trait]
        impl EntityIngestor for LyingIngestor {
            async fn upsert(&self, id: u32) -> dexsync_domain::Result<()> {
                self.0.written.lock().unwrap().insert(id);
                Err(DexError::Network("timed out after write".into()))
            }
        }

        let world = World::new(vec![1, 2, 3]);
        let runner = PassRunner::new(
            Arc::new(WorldIndex(Arc::clone(&world))),
            Arc::new(WorldStore(Arc::clone(&world))),
            Arc::new(LyingIngestor(Arc::clone(&world))),
        );

        let summary = runner.run(&params(2, 2, 1), None).await.unwrap();

        assert_eq!(summary.ok, 3);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_boundary_snapshots_carry_authoritative_counts() {
        let world = World::new((1..=8).collect());
        world.fail_times(5, u32::MAX);
        let (runner, _) = runner_for(&world);

        let snapshots: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);
        let progress: ProgressFn = Arc::new(move |update| sink.lock().unwrap().push(update));

        let mut p = params(2, 4, 1);
        p.retry_rounds = 0;
        runner.run(&p, Some(progress)).await.unwrap();

        let snapshots = snapshots.lock().unwrap();
        let last_sync = snapshots
            .iter()
            .filter(|u| u.phase == SyncPhase::Sync)
            .last()
            .expect("sync snapshots emitted");
        assert_eq!(last_sync.failed, 1);
        assert_eq!(last_sync.ok, 7);
        assert_eq!(last_sync.batches, 2);
    }

    #[tokio::test]
    async fn empty_universe_short_circuits() {
        let world = World::new(Vec::new());
        let (runner, ingestor) = runner_for(&world);

        let summary = runner.run(&params(2, 4, 1), None).await.unwrap();

        assert_eq!(summary, PassSummary { ok: 0, skipped: 0, failed: 0, total: 0, elapsed_secs: 0.0 });
        assert_eq!(ingestor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_from_is_exact_set_difference() {
        let present: HashSet<u32> = [1, 3].into_iter().collect();
        assert_eq!(missing_from(&[1, 2, 3, 4], &present), vec![2, 4]);
    }
}
