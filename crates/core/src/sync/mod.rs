//! Multi-level synchronization engine.
//!
//! Control flow: [`orchestrator::SyncOrchestrator`] repeats
//! [`pass::PassRunner`] across runs with adaptive concurrency; each pass
//! enumerates the ID universe, fans batches out to [`worker::RetryWorker`]
//! wrapped ingestor calls, and reconciles every batch against the store.

pub mod orchestrator;
pub mod pass;
pub mod ports;
mod progress;
pub mod worker;
