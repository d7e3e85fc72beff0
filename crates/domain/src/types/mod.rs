//! Domain types and models

pub mod cache;
pub mod config;
pub mod options;
pub mod pokemon;
pub mod progress;

pub use cache::*;
pub use config::*;
pub use options::*;
pub use pokemon::*;
pub use progress::*;
