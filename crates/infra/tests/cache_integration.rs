//! Cache behavior against a simulated upstream: freshness, revalidation
//! and full replacement, each checked through the persisted rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dexsync_domain::DexError;
use dexsync_infra::api::ResourceCache;
use dexsync_infra::database::{CacheRepository, DbManager};
use dexsync_infra::http::HttpClient;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    repo: Arc<CacheRepository>,
    _dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let dir = TempDir::new().expect("temp dir");
        let db = Arc::new(DbManager::new(dir.path().join("cache.db"), 2).expect("manager"));
        db.run_migrations().expect("migrations");
        Self { server, repo: Arc::new(CacheRepository::new(db)), _dir: dir }
    }

    fn cache(&self, ttl: Duration) -> ResourceCache {
        let http = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .build()
            .expect("http client");
        ResourceCache::new(http, Arc::clone(&self.repo), ttl)
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}{}", self.server.uri(), suffix)
    }
}

#[tokio::test]
async fn fresh_rows_are_served_without_network_calls() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/25/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"a1\"")
                .set_body_json(json!({"id": 25, "name": "pikachu"})),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let cache = harness.cache(Duration::from_secs(3600));
    let url = harness.url("/pokemon/25/");

    let first = cache.get_json(&url).await.expect("cold fetch");
    let second = cache.get_json(&url).await.expect("warm fetch");

    assert_eq!(first["name"], "pikachu");
    assert_eq!(second, first);

    let row = harness.repo.get(&url).await.expect("row read").expect("row");
    assert_eq!(row.etag, "\"a1\"");
    assert!(row.is_fresh(Utc::now()));
}

#[tokio::test]
async fn stale_rows_revalidate_with_304_and_keep_their_payload() {
    let harness = Harness::new().await;
    let url = harness.url("/pokemon/1/");

    Mock::given(method("GET"))
        .and(path("/pokemon/1/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .set_body_json(json!({"id": 1, "name": "bulbasaur"})),
        )
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon/1/"))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&harness.server)
        .await;

    // A zero TTL stores the row already stale, forcing revalidation.
    let payload = harness.cache(Duration::ZERO).get_json(&url).await.expect("cold fetch");
    assert_eq!(payload["name"], "bulbasaur");

    let revalidated = harness.cache(Duration::from_secs(3600)).get_json(&url).await.expect("304");
    assert_eq!(revalidated, payload);

    let row = harness.repo.get(&url).await.expect("row read").expect("row");
    assert_eq!(row.etag, "\"v1\"");
    assert!(row.is_fresh(Utc::now()), "revalidation must advance the expiry");
}

#[tokio::test]
async fn a_changed_payload_replaces_the_row_wholesale() {
    let harness = Harness::new().await;
    let url = harness.url("/pokemon/3/");

    Mock::given(method("GET"))
        .and(path("/pokemon/3/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v1\"")
                .set_body_json(json!({"id": 3, "name": "venusaur", "weight": 1000})),
        )
        .up_to_n_times(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon/3/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("etag", "\"v2\"")
                .set_body_json(json!({"id": 3, "name": "venusaur", "weight": 1555})),
        )
        .expect(1)
        .mount(&harness.server)
        .await;

    let cache = harness.cache(Duration::ZERO);
    let first = cache.get_json(&url).await.expect("cold fetch");
    assert_eq!(first["weight"], 1000);

    let second = cache.get_json(&url).await.expect("refetch");
    assert_eq!(second["weight"], 1555);

    let row = harness.repo.get(&url).await.expect("row read").expect("row");
    assert_eq!(row.etag, "\"v2\"");
    assert_eq!(row.payload["weight"], 1555);
}

#[tokio::test]
async fn permanent_upstream_errors_surface_as_upstream() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/9999/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.server)
        .await;

    let cache = harness.cache(Duration::from_secs(3600));
    let result = cache.get_json(&harness.url("/pokemon/9999/")).await;

    assert!(matches!(result, Err(DexError::Upstream(404))));
}

#[tokio::test]
async fn non_json_bodies_are_malformed() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&harness.server)
        .await;

    let cache = harness.cache(Duration::from_secs(3600));
    let result = cache.get_json(&harness.url("/pokemon/7/")).await;

    assert!(matches!(result, Err(DexError::MalformedPayload(_))));
}
