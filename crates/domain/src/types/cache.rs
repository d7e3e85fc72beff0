//! Persisted HTTP resource cache row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cached upstream payload, keyed by request URL.
///
/// Stores the raw JSON payload together with the HTTP validators the
/// upstream returned (`ETag` / `Last-Modified`, empty string when absent)
/// and a freshness horizon. Rows are created on the first successful fetch
/// and never deleted; a 304 revalidation only advances `expires_at`, while
/// a 200 replaces payload, validators and expiry together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub url: String,
    pub payload: Value,
    pub etag: String,
    pub last_modified: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheRecord {
    /// Whether the row can be served without touching the network.
    ///
    /// A missing `expires_at` means the row carries no freshness data and
    /// must be revalidated.
    pub fn is_fresh(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires > at)
    }

    /// Conditional request headers derived from the stored validators.
    pub fn validator_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if !self.etag.is_empty() {
            headers.push(("If-None-Match", self.etag.clone()));
        }
        if !self.last_modified.is_empty() {
            headers.push(("If-Modified-Since", self.last_modified.clone()));
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn record(expires_at: Option<DateTime<Utc>>) -> CacheRecord {
        CacheRecord {
            url: "https://pokeapi.co/api/v2/pokemon/25/".into(),
            payload: json!({"id": 25}),
            etag: "\"a1\"".into(),
            last_modified: String::new(),
            fetched_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn future_expiry_is_fresh() {
        let now = Utc::now();
        assert!(record(Some(now + Duration::hours(1))).is_fresh(now));
    }

    #[test]
    fn past_or_missing_expiry_is_stale() {
        let now = Utc::now();
        assert!(!record(Some(now - Duration::seconds(1))).is_fresh(now));
        assert!(!record(None).is_fresh(now));
    }

    #[test]
    fn validator_headers_skip_empty_values() {
        let row = record(None);
        let headers = row.validator_headers();
        assert_eq!(headers, vec![("If-None-Match", "\"a1\"".to_string())]);
    }
}
