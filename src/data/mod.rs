//! Raw document ingestion and the normalized-text cache.

pub mod cache;
pub mod source;

pub use cache::NormalizationCache;
pub use source::{DocumentSource, InMemorySource, JsonDirSource, RawDocument};
