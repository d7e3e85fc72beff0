//! # Dexsync Domain
//!
//! Business domain types for the pokédex sync engine.
//!
//! This crate contains:
//! - Cache and catalog entity types (`CacheRecord`, `Pokemon`)
//! - Progress/summary/report types produced by the sync engine
//! - Sync parameter types with construction-time validation
//! - Domain error type and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other dexsync crates
//! - No I/O: pure data structures and validation logic

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use errors::*;
pub use types::*;
