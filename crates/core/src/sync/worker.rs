//! Retry wrapper around a single-entity ingest operation.

use std::sync::Arc;
use std::time::Duration;

use dexsync_domain::DexError;
use rand::Rng;
use tracing::{debug, warn};

use super::ports::EntityIngestor;

/// Backoff never grows past this many seconds.
const BACKOFF_CAP_SECS: f64 = 4.0;
/// First backoff step, doubled on every failed attempt.
const BACKOFF_BASE_SECS: f64 = 0.5;
/// Uniform jitter added on top of each backoff sleep.
const JITTER_MAX_SECS: f64 = 0.2;

/// Coarse failure category surfaced alongside the boolean outcome, so
/// callers can distinguish transient from malformed failures without
/// re-deriving them from logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 429/5xx or a network-level failure; likely to clear up.
    Transient,
    /// Any other upstream status.
    Permanent,
    /// Unparseable payload or missing required fields.
    Malformed,
    /// Database or internal failure.
    Other,
}

impl From<&DexError> for FailureKind {
    fn from(err: &DexError) -> Self {
        match err {
            DexError::Transient(_) | DexError::Network(_) => Self::Transient,
            DexError::Upstream(_) => Self::Permanent,
            DexError::MalformedPayload(_) => Self::Malformed,
            _ => Self::Other,
        }
    }
}

/// Result of one retried worker call.
///
/// `ok` is optimistic: a late-timing-out attempt may have written data after
/// the worker gave up, so authoritative success is always re-verified against
/// the store by the pass runner.
#[derive(Debug, Clone, Copy)]
pub struct WorkerOutcome {
    pub ok: bool,
    pub error: Option<FailureKind>,
}

impl WorkerOutcome {
    fn success() -> Self {
        Self { ok: true, error: None }
    }

    fn failure(kind: FailureKind) -> Self {
        Self { ok: false, error: Some(kind) }
    }
}

/// Runs an [`EntityIngestor`] call with bounded attempts and exponential
/// backoff plus jitter. Absorbs every error into a [`WorkerOutcome`] and a
/// log line; nothing propagates to the pool.
#[derive(Clone)]
pub struct RetryWorker {
    ingestor: Arc<dyn EntityIngestor>,
    attempts: u32,
}

impl RetryWorker {
    pub fn new(ingestor: Arc<dyn EntityIngestor>, attempts: u32) -> Self {
        Self { ingestor, attempts: attempts.max(1) }
    }

    /// Attempt the upsert up to the configured number of tries.
    pub async fn run(&self, id: u32) -> WorkerOutcome {
        let mut last_err: Option<DexError> = None;

        for attempt in 0..self.attempts {
            match self.ingestor.upsert(id).await {
                Ok(()) => return WorkerOutcome::success(),
                Err(err) => {
                    if attempt == 0 {
                        debug!(id, error = %err, "first upsert failure");
                    }
                    last_err = Some(err);
                    if attempt + 1 < self.attempts {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }

        let kind = last_err.as_ref().map_or(FailureKind::Other, FailureKind::from);
        warn!(
            id,
            attempts = self.attempts,
            error = last_err.as_ref().map(ToString::to_string),
            "giving up on entity after exhausting attempts"
        );
        WorkerOutcome::failure(kind)
    }
}

/// `min(cap, base * 2^attempt) + jitter(0, 0.2)` seconds.
fn backoff_delay(attempt: u32) -> Duration {
    let backoff = (BACKOFF_BASE_SECS * 2f64.powi(attempt as i32)).min(BACKOFF_CAP_SECS);
    let jitter = rand::thread_rng().gen_range(0.0..JITTER_MAX_SECS);
    Duration::from_secs_f64(backoff + jitter)
}
