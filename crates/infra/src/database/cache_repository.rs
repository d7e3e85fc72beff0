//! Resource cache repository
//!
//! Owns the `api_resource_cache` table: one row per upstream URL with the
//! payload, its HTTP validators and a freshness horizon.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dexsync_domain::{CacheRecord, DexError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;

use super::manager::{map_sql_error, DbManager};

/// SQLite-backed store for [`CacheRecord`] rows.
pub struct CacheRepository {
    db: Arc<DbManager>,
}

impl CacheRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Look up the cache row for `url`, if any.
    pub async fn get(&self, url: &str) -> Result<Option<CacheRecord>> {
        let db = Arc::clone(&self.db);
        let url = url.to_string();

        task::spawn_blocking(move || -> Result<Option<CacheRecord>> {
            let conn = db.get_connection()?;
            query_record(&conn, &url)
        })
        .await
        .map_err(map_join_error)?
    }

    /// Extend the row's validity without touching payload or validators
    /// (the 304 revalidation path).
    pub async fn bump_expiry(&self, url: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let db = Arc::clone(&self.db);
        let url = url.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE api_resource_cache SET expires_at = ?2 WHERE url = ?1",
                params![url, expires_at.to_rfc3339()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Create or replace the row for `record.url` in one atomic write:
    /// payload, validators and expiry always move together.
    pub async fn replace(&self, record: CacheRecord) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let payload = serde_json::to_string(&record.payload)
                .map_err(|err| DexError::Internal(format!("cache payload not serializable: {err}")))?;
            conn.execute(
                "INSERT INTO api_resource_cache
                     (url, payload, etag, last_modified, fetched_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (url) DO UPDATE SET
                     payload = excluded.payload,
                     etag = excluded.etag,
                     last_modified = excluded.last_modified,
                     fetched_at = excluded.fetched_at,
                     expires_at = excluded.expires_at",
                params![
                    record.url,
                    payload,
                    record.etag,
                    record.last_modified,
                    record.fetched_at.to_rfc3339(),
                    record.expires_at.map(|ts| ts.to_rfc3339()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_record(conn: &Connection, url: &str) -> Result<Option<CacheRecord>> {
    let sql = "SELECT url, payload, etag, last_modified, fetched_at, expires_at
               FROM api_resource_cache WHERE url = ?1";

    conn.query_row(sql, params![url], map_cache_row)
        .optional()
        .map_err(map_sql_error)?
        .transpose()
}

fn map_cache_row(row: &Row<'_>) -> rusqlite::Result<Result<CacheRecord>> {
    let url: String = row.get(0)?;
    let payload: String = row.get(1)?;
    let etag: String = row.get(2)?;
    let last_modified: String = row.get(3)?;
    let fetched_at: String = row.get(4)?;
    let expires_at: Option<String> = row.get(5)?;

    Ok(build_record(url, &payload, etag, last_modified, &fetched_at, expires_at.as_deref()))
}

fn build_record(
    url: String,
    payload: &str,
    etag: String,
    last_modified: String,
    fetched_at: &str,
    expires_at: Option<&str>,
) -> Result<CacheRecord> {
    let payload = serde_json::from_str(payload)
        .map_err(|err| DexError::Database(format!("corrupt cached payload for {url}: {err}")))?;
    let fetched_at = parse_ts(fetched_at)?;
    let expires_at = expires_at.map(parse_ts).transpose()?;

    Ok(CacheRecord { url, payload, etag, last_modified, fetched_at, expires_at })
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| DexError::Database(format!("invalid timestamp '{value}': {err}")))
}

pub(crate) fn map_join_error(err: task::JoinError) -> DexError {
    DexError::Internal(format!("blocking task failed: {err}"))
}
