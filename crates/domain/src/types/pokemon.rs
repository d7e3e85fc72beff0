//! Catalog entity stored in the local database.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pokémon row, keyed by the upstream-assigned `pokeapi_id`.
///
/// `types` and `abilities` are full-replacement relation sets: every upsert
/// rewrites them wholesale, and members must already exist as reference rows.
/// `generation` is the singular classification link; `None` is valid and
/// simply means the reference row was not synced yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub pokeapi_id: u32,
    pub name: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    /// Flat stat map, e.g. `{"hp": 45, "attack": 49, ...}`.
    pub base_stats: BTreeMap<String, i64>,
    pub generation: Option<String>,
    pub is_legendary: bool,
    pub is_mythical: bool,
    pub types: Vec<String>,
    pub abilities: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Reference row the catalog links to but never creates (type, ability,
/// generation). Pre-populated by a separate taxonomy sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: i64,
    pub slug: String,
    pub name: String,
}
