//! Validator-based JSON cache over the upstream API.
//!
//! Every read goes through [`ResourceCache::get_json`]: fresh rows are
//! served from the database without a network call, stale rows are
//! revalidated with conditional headers, and misses are fetched and stored.
//! Two tasks racing on a cold URL may both hit the network; the keyed
//! replace makes that benign.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dexsync_domain::{CacheRecord, DexError, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::database::CacheRepository;
use crate::http::HttpClient;

/// Cached JSON reader for upstream endpoints.
pub struct ResourceCache {
    http: HttpClient,
    repo: Arc<CacheRepository>,
    ttl: chrono::Duration,
}

impl ResourceCache {
    pub fn new(http: HttpClient, repo: Arc<CacheRepository>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        Self { http, repo, ttl }
    }

    /// Fetch `url` as JSON, serving from cache when fresh.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        self.get_json_with(url, &[]).await
    }

    /// Like [`get_json`](Self::get_json), with caller headers merged on top
    /// of the stored conditional headers. A caller header with the same name
    /// overrides the conditional one.
    pub async fn get_json_with(&self, url: &str, extra_headers: &[(&str, String)]) -> Result<Value> {
        let now = Utc::now();
        let cached = self.repo.get(url).await?;

        if let Some(record) = &cached {
            if record.is_fresh(now) {
                debug!(%url, "cache hit, fresh");
                return Ok(record.payload.clone());
            }
        }

        let mut builder = self.http.request(Method::GET, url);
        if let Some(record) = &cached {
            for (name, value) in record.validator_headers() {
                builder = builder.header(name, value);
            }
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, value);
        }

        let response = self.http.send(builder).await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            let Some(record) = cached else {
                // A 304 with no stored row means we never sent validators;
                // treat it as an upstream protocol violation.
                return Err(DexError::Upstream(status.as_u16()));
            };
            let expires_at = Utc::now() + self.ttl;
            self.repo.bump_expiry(url, expires_at).await?;
            debug!(%url, "cache revalidated via 304");
            return Ok(record.payload);
        }

        if !status.is_success() {
            return Err(status_error(status.as_u16()));
        }

        let etag = header_value(&response, "etag");
        let last_modified = header_value(&response, "last-modified");
        let body = response
            .text()
            .await
            .map_err(|err| DexError::Network(format!("reading body of {url}: {err}")))?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|err| DexError::MalformedPayload(format!("{url}: {err}")))?;

        let fetched_at = Utc::now();
        let record = CacheRecord {
            url: url.to_string(),
            payload: payload.clone(),
            etag,
            last_modified,
            fetched_at,
            expires_at: Some(fetched_at + self.ttl),
        };
        self.repo.replace(record).await?;
        debug!(%url, "cache filled from upstream");
        Ok(payload)
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn status_error(status: u16) -> DexError {
    match status {
        429 | 500 | 502 | 503 | 504 => DexError::Transient(status),
        _ => DexError::Upstream(status),
    }
}
