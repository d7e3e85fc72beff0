//! dexsync binary: load config, wire the adapters, run the orchestrator.
//!
//! Exit code is zero when the final run converged to at most
//! `sync.target_fail` failed entities, non-zero otherwise.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use dexsync_core::{EntityStore, PassRunner, ProgressFn, SyncOrchestrator};
use dexsync_domain::Result;
use dexsync_infra::api::{PokeApi, PokemonIndex, ResourceCache};
use dexsync_infra::config;
use dexsync_infra::database::{CacheRepository, DbManager, PokemonRepository, TaxonomyRepository};
use dexsync_infra::http::HttpClient;
use dexsync_infra::sync::PokemonIngestor;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "sync aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let config = config::load()?;

    let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
    db.run_migrations()?;

    let mut http = HttpClient::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .max_attempts(config.http.max_attempts as usize)
        .base_backoff(Duration::from_millis(config.http.base_backoff_ms));
    if let Some(agent) = &config.http.user_agent {
        http = http.user_agent(agent.clone());
    }
    let http = http.build()?;

    let cache = Arc::new(ResourceCache::new(
        http,
        Arc::new(CacheRepository::new(Arc::clone(&db))),
        Duration::from_secs(config.api.cache_ttl_secs),
    ));
    let api = Arc::new(PokeApi::new(cache, config.api.base_url.clone()));
    let pokemon = Arc::new(PokemonRepository::new(Arc::clone(&db)));
    let taxonomies = Arc::new(TaxonomyRepository::new(db));

    let ingestor = PokemonIngestor::new(Arc::clone(&api), Arc::clone(&pokemon), taxonomies);
    let runner = PassRunner::new(
        Arc::new(PokemonIndex::new(api)),
        Arc::clone(&pokemon) as Arc<dyn EntityStore>,
        Arc::new(ingestor),
    );

    let progress: ProgressFn = Arc::new(|update| {
        info!(
            phase = %update.phase,
            done = update.done,
            total = update.total,
            ok = update.ok,
            failed = update.failed,
            skipped = update.skipped,
            batch = update.batch,
            batches = update.batches,
            rate = update.rate,
            eta_secs = update.eta_secs,
            "progress"
        );
    });

    let target_fail = config.sync.target_fail;
    let orchestrator = SyncOrchestrator::new(runner, config.sync)?.with_progress(progress);
    let report = orchestrator.run().await?;

    info!(
        runs = report.runs,
        total_ok = report.total_ok,
        total_skipped = report.total_skipped,
        last_failed = report.last_failed,
        "sync complete"
    );

    if report.last_failed > target_fail {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
