//! Application configuration structures.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CACHE_TTL, DEFAULT_HTTP_TIMEOUT};
use crate::types::options::SyncOptions;

/// Top-level configuration, loaded from environment variables or a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub api: ApiConfig,
    pub sync: SyncOptions,
}

/// Local SQLite settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "dexsync.db".into(), pool_size: 8 }
    }
}

/// Transport settings for the upstream HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
            max_attempts: 3,
            base_backoff_ms: 200,
            user_agent: None,
        }
    }
}

/// Upstream catalog endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: "https://pokeapi.co/api/v2".into(), cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs() }
    }
}
