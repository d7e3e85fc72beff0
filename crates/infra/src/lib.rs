//! # Dexsync Infrastructure
//!
//! Infrastructure implementations of core sync ports.
//!
//! This crate contains:
//! - The pooled HTTP transport with transient-status retry
//! - The validator-based resource cache over SQLite
//! - The PokeAPI client (index enumeration + entity fetch)
//! - The single-entity ingestor and the rusqlite repositories
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `dexsync-core`
//! - Contains all "impure" code (HTTP, SQL, filesystem)

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod sync;

// Re-export commonly used items
pub use api::*;
pub use database::*;
pub use http::*;
pub use sync::*;
