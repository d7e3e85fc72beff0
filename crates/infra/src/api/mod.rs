//! Upstream API access: URL building, the validator cache and index paging.

pub mod cache;
pub mod index;
pub mod urls;

pub use cache::ResourceCache;
pub use index::{PokeApi, PokemonIndex};
