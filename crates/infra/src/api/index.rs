//! Index enumeration against the upstream catalog.
//!
//! The upstream exposes each catalog as a paginated index
//! (`/{resource}/?offset=N&limit=M`) whose entries carry the entity URL but
//! not a bare ID; IDs are recovered from the trailing path segment. A
//! `?limit=1` probe reads the total count without paying for a full page.

use std::sync::Arc;

use async_trait::async_trait;
use dexsync_core::CatalogIndex;
use dexsync_domain::{DexError, Result};
use serde_json::Value;
use tracing::{debug, warn};

use super::cache::ResourceCache;
use super::urls;

/// Typed access to the upstream REST API through the resource cache.
pub struct PokeApi {
    cache: Arc<ResourceCache>,
    base_url: String,
}

impl PokeApi {
    pub fn new(cache: Arc<ResourceCache>, base_url: impl Into<String>) -> Self {
        Self { cache, base_url: base_url.into() }
    }

    /// Total entity count for `resource`, via a minimal `?limit=1` probe.
    pub async fn total_count(&self, resource: &str) -> Result<u64> {
        let url = urls::index_url(&self.base_url, resource, 0, 1);
        let payload = self.cache.get_json(&url).await?;
        payload
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| DexError::MalformedPayload(format!("index probe {url}: no count")))
    }

    /// Every canonical ID in the `resource` index, paged from offset zero.
    ///
    /// Paging stops once the cumulative offset reaches the reported count,
    /// or earlier if the upstream returns an empty page.
    pub async fn index_ids(&self, resource: &str, page_size: usize) -> Result<Vec<u32>> {
        let total = self.total_count(resource).await?;
        let page_size = page_size.max(1) as u64;
        let mut ids = Vec::with_capacity(total as usize);
        let mut offset = 0u64;

        while offset < total {
            let url = urls::index_url(&self.base_url, resource, offset, page_size);
            let payload = self.cache.get_json(&url).await?;
            let results = payload
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| DexError::MalformedPayload(format!("index page {url}: no results")))?;
            if results.is_empty() {
                warn!(resource, offset, total, "index page empty before reported count, stopping");
                break;
            }
            for entry in results {
                let Some(entity_url) = entry.get("url").and_then(Value::as_str) else {
                    return Err(DexError::MalformedPayload(format!(
                        "index page {url}: entry without url"
                    )));
                };
                let id = urls::trailing_id(entity_url).ok_or_else(|| {
                    DexError::MalformedPayload(format!("unparseable entity url {entity_url}"))
                })?;
                ids.push(id);
            }
            offset += results.len() as u64;
        }

        debug!(resource, count = ids.len(), "index enumerated");
        Ok(ids)
    }

    /// Fetch one entity payload by canonical ID.
    pub async fn entity(&self, resource: &str, id: u32) -> Result<Value> {
        let url = urls::entity_url(&self.base_url, resource, id);
        self.cache.get_json(&url).await
    }

    /// Fetch an arbitrary upstream URL through the cache (secondary payloads
    /// referenced from an entity, like its species record).
    pub async fn payload_at(&self, url: &str) -> Result<Value> {
        self.cache.get_json(url).await
    }
}

/// [`CatalogIndex`] port bound to the `pokemon` catalog.
pub struct PokemonIndex {
    api: Arc<PokeApi>,
}

impl PokemonIndex {
    pub fn new(api: Arc<PokeApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CatalogIndex for PokemonIndex {
    async fn total_count(&self) -> Result<u64> {
        self.api.total_count("pokemon").await
    }

    async fn index_ids(&self, page_size: usize) -> Result<Vec<u32>> {
        self.api.index_ids("pokemon", page_size).await
    }
}
