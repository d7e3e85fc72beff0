//! Entity ingestion: payload normalization and the upsert pipeline.

pub mod ingestor;
pub mod normalize;

pub use ingestor::PokemonIngestor;
