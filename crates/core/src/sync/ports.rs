//! Port interfaces for sync operations

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dexsync_domain::{ProgressUpdate, Result};

/// Trait for enumerating the upstream catalog index
#[async_trait]
pub trait CatalogIndex: Send + Sync {
    /// Total number of entities the upstream reports for the catalog
    async fn total_count(&self) -> Result<u64>;

    /// Materialize every canonical ID by paging the index endpoint.
    ///
    /// Stateless and restartable: each call re-pages from offset zero.
    async fn index_ids(&self, page_size: usize) -> Result<Vec<u32>>;
}

/// Trait for querying which entities already exist locally
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Return the subset of `ids` that are present in the store.
    async fn existing_ids(&self, ids: &[u32]) -> Result<HashSet<u32>>;
}

/// Trait for fetching, normalizing and persisting one entity
#[async_trait]
pub trait EntityIngestor: Send + Sync {
    /// Idempotent upsert of a single entity by canonical ID.
    async fn upsert(&self, id: u32) -> Result<()>;
}

/// Progress callback; the consumer renders, no return value is used.
pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Sink for non-fatal missing-reference notices.
pub type WarningFn = Arc<dyn Fn(String) + Send + Sync>;
