//! Labeled corpus construction for doc2vec-style document embeddings.
//!
//! Raw JSON documents are filtered and normalized into tagged documents for
//! an external embedding trainer; the trained model's document vectors are
//! then joined with citation counts into feature/label arrays.

pub mod config;
pub mod corpus;
pub mod data;
pub mod error;
pub mod nlp;
pub mod pipeline;

pub use error::{CorpusError, Result};
