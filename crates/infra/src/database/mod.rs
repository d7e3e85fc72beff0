//! Database implementations

pub mod cache_repository;
pub mod manager;
pub mod pokemon_repository;
pub mod taxonomy_repository;

pub use cache_repository::*;
pub use manager::*;
pub use pokemon_repository::*;
pub use taxonomy_repository::*;
