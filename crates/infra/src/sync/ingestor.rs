//! The entity upsert pipeline behind the [`EntityIngestor`] port.
//!
//! Fetch through the cache, normalize, resolve reference slugs, persist.
//! Reference rows are never created here; a slug with no row produces one
//! warning through the sink and the link is omitted.

use std::sync::Arc;

use async_trait::async_trait;
use dexsync_core::{EntityIngestor, WarningFn};
use dexsync_domain::Result;
use tracing::warn;

use crate::api::PokeApi;
use crate::database::{PokemonRepository, PokemonWrite, TaxonomyKind, TaxonomyRepository};

use super::normalize::{self, SpeciesFacts};

/// Fetches, normalizes and persists one catalog entity per call.
pub struct PokemonIngestor {
    api: Arc<PokeApi>,
    pokemon: Arc<PokemonRepository>,
    taxonomies: Arc<TaxonomyRepository>,
    warnings: Option<WarningFn>,
}

impl PokemonIngestor {
    pub fn new(
        api: Arc<PokeApi>,
        pokemon: Arc<PokemonRepository>,
        taxonomies: Arc<TaxonomyRepository>,
    ) -> Self {
        Self { api, pokemon, taxonomies, warnings: None }
    }

    /// Install a sink for missing-reference notices.
    pub fn with_warnings(mut self, sink: WarningFn) -> Self {
        self.warnings = Some(sink);
        self
    }

    async fn species_facts(&self, payload: &serde_json::Value) -> Result<SpeciesFacts> {
        let Some(url) = normalize::species_url(payload) else {
            return Ok(SpeciesFacts::default());
        };
        let species = self.api.payload_at(url).await?;
        Ok(normalize::species_facts(&species))
    }

    async fn resolve_links(
        &self,
        name: &str,
        kind: TaxonomyKind,
        slugs: &[String],
    ) -> Result<Vec<i64>> {
        let resolved = self.taxonomies.resolve_slugs(kind, slugs).await?;
        for slug in &resolved.missing {
            self.emit_warning(format!("unknown {kind:?} slug '{slug}' on pokemon '{name}'"));
        }
        Ok(resolved.ids)
    }

    fn emit_warning(&self, message: String) {
        warn!(message = %message, "missing reference during ingest");
        if let Some(sink) = &self.warnings {
            sink(message);
        }
    }
}

#[async_trait]
impl EntityIngestor for PokemonIngestor {
    async fn upsert(&self, id: u32) -> Result<()> {
        let payload = self.api.entity("pokemon", id).await?;
        let normalized = normalize::normalize(&payload)?;
        let facts = self.species_facts(&payload).await?;

        let generation_id = match &facts.generation_slug {
            Some(slug) => {
                let resolved = self.taxonomies.resolve_generation(slug).await?;
                if resolved.is_none() {
                    self.emit_warning(format!(
                        "unknown generation slug '{slug}' on pokemon '{}'",
                        normalized.name
                    ));
                }
                resolved
            }
            None => None,
        };

        let type_ids = self
            .resolve_links(&normalized.name, TaxonomyKind::Type, &normalized.type_slugs)
            .await?;
        let ability_ids = self
            .resolve_links(&normalized.name, TaxonomyKind::Ability, &normalized.ability_slugs)
            .await?;

        self.pokemon
            .upsert(PokemonWrite {
                pokeapi_id: normalized.pokeapi_id,
                name: normalized.name,
                height: normalized.height,
                weight: normalized.weight,
                base_stats: normalized.base_stats,
                generation_id,
                is_legendary: facts.is_legendary,
                is_mythical: facts.is_mythical,
                type_ids,
                ability_ids,
            })
            .await
    }
}
