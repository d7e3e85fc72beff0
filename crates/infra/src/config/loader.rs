//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `DEXSYNC_DB_PATH` is set, the environment wins: remaining
//!    `DEXSYNC_*` variables overlay the built-in defaults
//! 2. Otherwise probes multiple paths for a config file (JSON or TOML)
//! 3. Otherwise the built-in defaults apply
//!
//! ## Environment Variables
//! - `DEXSYNC_DB_PATH`: Database file path (sentinel for env-based config)
//! - `DEXSYNC_DB_POOL_SIZE`: Connection pool size
//! - `DEXSYNC_HTTP_TIMEOUT`: Per-request timeout in seconds
//! - `DEXSYNC_BASE_URL`: Upstream API base URL
//! - `DEXSYNC_CACHE_TTL`: Cache freshness horizon in seconds
//! - `DEXSYNC_WORKERS`: Concurrent upsert workers
//! - `DEXSYNC_BATCH_SIZE`: IDs per batch
//! - `DEXSYNC_MAX_RUNS`: Orchestrator run cap
//! - `DEXSYNC_TARGET_FAIL`: Acceptable residual failures
//! - `DEXSYNC_REFRESH_ALL`: Re-ingest entities that already exist (true/false)
//!
//! ## File Locations
//! The loader probes `./config.{json,toml}`, `./dexsync.{json,toml}`, the
//! same names one and two directories up, and the executable's directory.

use std::path::{Path, PathBuf};

use dexsync_domain::{AppConfig, DexError, Result};

/// Load configuration with automatic fallback strategy.
///
/// # Errors
/// Returns `DexError::Config` when a config file exists but cannot be
/// parsed, or when an environment variable carries an invalid value.
pub fn load() -> Result<AppConfig> {
    if std::env::var("DEXSYNC_DB_PATH").is_ok() {
        let config = load_from_env()?;
        tracing::info!("configuration loaded from environment variables");
        return Ok(config);
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("no configuration found, using built-in defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load configuration from `DEXSYNC_*` environment variables, overlaying
/// the built-in defaults.
///
/// # Errors
/// Returns `DexError::Config` when a set variable fails to parse.
pub fn load_from_env() -> Result<AppConfig> {
    let mut config = AppConfig::default();

    if let Ok(path) = std::env::var("DEXSYNC_DB_PATH") {
        config.database.path = path;
    }
    if let Some(size) = env_parse::<u32>("DEXSYNC_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }
    if let Some(timeout) = env_parse::<u64>("DEXSYNC_HTTP_TIMEOUT")? {
        config.http.timeout_secs = timeout;
    }
    if let Ok(base_url) = std::env::var("DEXSYNC_BASE_URL") {
        config.api.base_url = base_url;
    }
    if let Some(ttl) = env_parse::<u64>("DEXSYNC_CACHE_TTL")? {
        config.api.cache_ttl_secs = ttl;
    }
    if let Some(workers) = env_parse::<usize>("DEXSYNC_WORKERS")? {
        config.sync.workers = workers;
    }
    if let Some(batch_size) = env_parse::<usize>("DEXSYNC_BATCH_SIZE")? {
        config.sync.batch_size = batch_size;
    }
    if let Some(max_runs) = env_parse::<u32>("DEXSYNC_MAX_RUNS")? {
        config.sync.max_runs = max_runs;
    }
    if let Some(target_fail) = env_parse::<usize>("DEXSYNC_TARGET_FAIL")? {
        config.sync.target_fail = target_fail;
    }
    config.sync.refresh_all = env_bool("DEXSYNC_REFRESH_ALL", config.sync.refresh_all);

    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `DexError::Config` when the file is missing, unreadable or
/// fails to parse.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DexError::Config(format!("config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DexError::Config("no config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DexError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DexError::Config(format!("invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DexError::Config(format!("invalid JSON format: {e}"))),
        _ => Err(DexError::Config(format!("unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file, returning the
/// first one that exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("dexsync.json"),
            cwd.join("dexsync.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
            cwd.join("../../config.json"),
            cwd.join("../../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("dexsync.json"),
                exe_dir.join("dexsync.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| DexError::Config(format!("invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
