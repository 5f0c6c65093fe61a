//! Text processing applied to document bodies before embedding.

pub mod normalize;
pub mod singular;
pub mod stopwords;

pub use normalize::{normalize, Normalizer, TextNormalizer};
