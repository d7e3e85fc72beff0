//! Taxonomy repository
//!
//! Read access to the reference tables (`types`, `abilities`,
//! `generations`). These are populated out of band; the sync engine only
//! resolves slugs against them and reports the ones it cannot find.

use std::collections::HashMap;
use std::sync::Arc;

use dexsync_domain::{ReferenceEntry, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tokio::task;

use super::cache_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

/// Which reference table a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Type,
    Ability,
    Generation,
}

impl TaxonomyKind {
    fn table(self) -> &'static str {
        match self {
            Self::Type => "types",
            Self::Ability => "abilities",
            Self::Generation => "generations",
        }
    }
}

/// Slug resolution result: the IDs that matched, and the slugs that did not.
#[derive(Debug, Default)]
pub struct ResolvedSlugs {
    pub ids: Vec<i64>,
    pub missing: Vec<String>,
}

/// SQLite-backed lookups over the reference tables.
pub struct TaxonomyRepository {
    db: Arc<DbManager>,
}

impl TaxonomyRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Resolve `slugs` against one reference table, preserving input order
    /// for the matched IDs. Unknown slugs land in `missing` instead of
    /// failing the whole call.
    pub async fn resolve_slugs(&self, kind: TaxonomyKind, slugs: &[String]) -> Result<ResolvedSlugs> {
        if slugs.is_empty() {
            return Ok(ResolvedSlugs::default());
        }
        let db = Arc::clone(&self.db);
        let slugs = slugs.to_vec();

        task::spawn_blocking(move || -> Result<ResolvedSlugs> {
            let conn = db.get_connection()?;
            resolve_in_conn(&conn, kind, &slugs)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Resolve a single generation slug, if present.
    pub async fn resolve_generation(&self, slug: &str) -> Result<Option<i64>> {
        let db = Arc::clone(&self.db);
        let slug = slug.to_string();

        task::spawn_blocking(move || -> Result<Option<i64>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id FROM generations WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Insert one reference row, keeping an existing row's name current.
    /// Used by the taxonomy seeding path, not the entity sync.
    pub async fn insert(&self, kind: TaxonomyKind, entry: ReferenceEntry) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let sql = format!(
                "INSERT INTO {} (id, slug, name) VALUES (?1, ?2, ?3)
                 ON CONFLICT (slug) DO UPDATE SET name = excluded.name",
                kind.table()
            );
            conn.execute(&sql, params![entry.id, entry.slug, entry.name])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn resolve_in_conn(conn: &Connection, kind: TaxonomyKind, slugs: &[String]) -> Result<ResolvedSlugs> {
    let placeholders = vec!["?"; slugs.len()].join(",");
    let sql = format!("SELECT slug, id FROM {} WHERE slug IN ({placeholders})", kind.table());

    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params_from_iter(slugs.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(map_sql_error)?;

    let mut by_slug: HashMap<String, i64> = HashMap::new();
    for row in rows {
        let (slug, id) = row.map_err(map_sql_error)?;
        by_slug.insert(slug, id);
    }

    let mut resolved = ResolvedSlugs::default();
    for slug in slugs {
        match by_slug.get(slug) {
            Some(id) => resolved.ids.push(*id),
            None => resolved.missing.push(slug.clone()),
        }
    }
    Ok(resolved)
}
