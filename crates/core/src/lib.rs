//! # Dexsync Core
//!
//! Pure sync-engine logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces for the catalog index, the entity store and
//!   the single-entity ingestor
//! - The retry worker, pass runner and multi-run orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `dexsync-domain`
//! - No database or HTTP code; all external effects go through traits

pub mod sync;

pub use sync::orchestrator::SyncOrchestrator;
pub use sync::pass::{PassParams, PassRunner};
pub use sync::ports::{CatalogIndex, EntityIngestor, EntityStore, ProgressFn, WarningFn};
pub use sync::worker::{FailureKind, RetryWorker, WorkerOutcome};
