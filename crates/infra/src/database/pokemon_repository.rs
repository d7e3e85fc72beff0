//! Pokémon repository
//!
//! Owns the `pokemon` table and its relation sets. Upserts are a single
//! transaction keyed by the upstream ID; relation sets are rewritten
//! wholesale so members the upstream no longer reports are dropped.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dexsync_core::EntityStore;
use dexsync_domain::{DexError, Pokemon, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::task;

use super::cache_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

/// Upper bound on SQL variables per statement; `IN (...)` lists are chunked.
const SQL_VAR_CHUNK: usize = 500;

/// One fully-resolved entity write: scalars plus the reference-row IDs the
/// ingestor managed to resolve. Slugs with no reference row never get here.
#[derive(Debug, Clone)]
pub struct PokemonWrite {
    pub pokeapi_id: u32,
    pub name: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub base_stats: BTreeMap<String, i64>,
    pub generation_id: Option<i64>,
    pub is_legendary: bool,
    pub is_mythical: bool,
    pub type_ids: Vec<i64>,
    pub ability_ids: Vec<i64>,
}

/// SQLite-backed store for catalog entities.
pub struct PokemonRepository {
    db: Arc<DbManager>,
}

impl PokemonRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Idempotent create-or-update of one entity and its relation sets, as a
    /// single transaction.
    pub async fn upsert(&self, write: PokemonWrite) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            upsert_in_tx(&tx, &write)?;
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Fetch one normalized entity by upstream ID.
    pub async fn get(&self, pokeapi_id: u32) -> Result<Option<Pokemon>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Option<Pokemon>> {
            let conn = db.get_connection()?;
            query_pokemon(&conn, pokeapi_id)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Page through the synced catalog, ordered by upstream ID.
    pub async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Pokemon>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Pokemon>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT pokeapi_id FROM pokemon ORDER BY pokeapi_id LIMIT ?1 OFFSET ?2",
                )
                .map_err(map_sql_error)?;
            let ids: Vec<u32> = stmt
                .query_map(params![limit as i64, offset as i64], |row| row.get(0))
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<_>>()
                .map_err(map_sql_error)?;
            drop(stmt);

            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(pokemon) = query_pokemon(&conn, id)? {
                    out.push(pokemon);
                }
            }
            Ok(out)
        })
        .await
        .map_err(map_join_error)?
    }

    fn existing_ids_blocking(conn: &Connection, ids: &[u32]) -> Result<HashSet<u32>> {
        let mut found = HashSet::new();
        for chunk in ids.chunks(SQL_VAR_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql =
                format!("SELECT pokeapi_id FROM pokemon WHERE pokeapi_id IN ({placeholders})");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| row.get::<_, u32>(0))
                .map_err(map_sql_error)?;
            for id in rows {
                found.insert(id.map_err(map_sql_error)?);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl EntityStore for PokemonRepository {
    async fn existing_ids(&self, ids: &[u32]) -> Result<HashSet<u32>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let db = Arc::clone(&self.db);
        let ids = ids.to_vec();

        task::spawn_blocking(move || -> Result<HashSet<u32>> {
            let conn = db.get_connection()?;
            Self::existing_ids_blocking(&conn, &ids)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn upsert_in_tx(tx: &Connection, write: &PokemonWrite) -> Result<()> {
    let base_stats = serde_json::to_string(&write.base_stats)
        .map_err(|err| DexError::Internal(format!("stat map not serializable: {err}")))?;

    tx.execute(
        "INSERT INTO pokemon
             (pokeapi_id, name, height, weight, base_stats, generation_id,
              is_legendary, is_mythical, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (pokeapi_id) DO UPDATE SET
             name = excluded.name,
             height = excluded.height,
             weight = excluded.weight,
             base_stats = excluded.base_stats,
             generation_id = excluded.generation_id,
             is_legendary = excluded.is_legendary,
             is_mythical = excluded.is_mythical,
             updated_at = excluded.updated_at",
        params![
            write.pokeapi_id,
            write.name,
            write.height,
            write.weight,
            base_stats,
            write.generation_id,
            write.is_legendary,
            write.is_mythical,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(map_sql_error)?;

    replace_links(tx, "pokemon_types", "type_id", write.pokeapi_id, &write.type_ids)?;
    replace_links(tx, "pokemon_abilities", "ability_id", write.pokeapi_id, &write.ability_ids)?;
    Ok(())
}

fn replace_links(
    tx: &Connection,
    table: &str,
    column: &str,
    pokemon_id: u32,
    ids: &[i64],
) -> Result<()> {
    tx.execute(&format!("DELETE FROM {table} WHERE pokemon_id = ?1"), params![pokemon_id])
        .map_err(map_sql_error)?;
    let sql = format!("INSERT OR IGNORE INTO {table} (pokemon_id, {column}) VALUES (?1, ?2)");
    for id in ids {
        tx.execute(&sql, params![pokemon_id, id]).map_err(map_sql_error)?;
    }
    Ok(())
}

fn query_pokemon(conn: &Connection, pokeapi_id: u32) -> Result<Option<Pokemon>> {
    let sql = "SELECT p.pokeapi_id, p.name, p.height, p.weight, p.base_stats,
                      g.slug, p.is_legendary, p.is_mythical, p.updated_at
               FROM pokemon p
               LEFT JOIN generations g ON g.id = p.generation_id
               WHERE p.pokeapi_id = ?1";

    let row = conn
        .query_row(sql, params![pokeapi_id], map_pokemon_row)
        .optional()
        .map_err(map_sql_error)?
        .transpose()?;

    let Some(mut pokemon) = row else { return Ok(None) };
    pokemon.types = query_link_slugs(conn, "pokemon_types", "types", "type_id", pokeapi_id)?;
    pokemon.abilities =
        query_link_slugs(conn, "pokemon_abilities", "abilities", "ability_id", pokeapi_id)?;
    Ok(Some(pokemon))
}

fn map_pokemon_row(row: &Row<'_>) -> rusqlite::Result<Result<Pokemon>> {
    let pokeapi_id: u32 = row.get(0)?;
    let name: String = row.get(1)?;
    let height: Option<i64> = row.get(2)?;
    let weight: Option<i64> = row.get(3)?;
    let base_stats: String = row.get(4)?;
    let generation: Option<String> = row.get(5)?;
    let is_legendary: bool = row.get(6)?;
    let is_mythical: bool = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(build_pokemon(
        pokeapi_id,
        name,
        height,
        weight,
        &base_stats,
        generation,
        is_legendary,
        is_mythical,
        &updated_at,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_pokemon(
    pokeapi_id: u32,
    name: String,
    height: Option<i64>,
    weight: Option<i64>,
    base_stats: &str,
    generation: Option<String>,
    is_legendary: bool,
    is_mythical: bool,
    updated_at: &str,
) -> Result<Pokemon> {
    let base_stats: BTreeMap<String, i64> = serde_json::from_str(base_stats)
        .map_err(|err| DexError::Database(format!("corrupt stat map for #{pokeapi_id}: {err}")))?;
    let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(updated_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| DexError::Database(format!("invalid timestamp '{updated_at}': {err}")))?;

    Ok(Pokemon {
        pokeapi_id,
        name,
        height,
        weight,
        base_stats,
        generation,
        is_legendary,
        is_mythical,
        types: Vec::new(),
        abilities: Vec::new(),
        updated_at,
    })
}

fn query_link_slugs(
    conn: &Connection,
    link_table: &str,
    ref_table: &str,
    link_column: &str,
    pokemon_id: u32,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT r.slug FROM {link_table} l
         JOIN {ref_table} r ON r.id = l.{link_column}
         WHERE l.pokemon_id = ?1
         ORDER BY r.slug"
    );
    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params![pokemon_id], |row| row.get::<_, String>(0))
        .map_err(map_sql_error)?;
    rows.collect::<rusqlite::Result<_>>().map_err(map_sql_error)
}
