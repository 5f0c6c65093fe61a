//! Embedding model artefacts: path convention and keyed-vector loading.

use std::{
    io::BufReader,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use tracing::info;

use crate::error::{CorpusError, Result};

/// Dimensionalities with a trained model artefact.
pub const SUPPORTED_DIMS: [usize; 3] = [100, 300, 600];

/// Per-document vectors of a trained embedding model.
pub trait EmbeddingModel {
    /// Length of every vector.
    fn dim(&self) -> usize;
    /// Every document tag the model was trained on.
    fn tags(&self) -> Vec<&str>;
    fn vector(&self, tag: &str) -> Option<&[f32]>;
}

/// `allDocs<DIM>D.model` for a supported dimensionality.
pub fn model_file_name(dim: usize) -> Result<String> {
    if !SUPPORTED_DIMS.contains(&dim) {
        return Err(CorpusError::InvalidDimension(dim));
    }
    Ok(format!("allDocs{dim}D.model"))
}

/// Location of the model artefact under the cache directory.
pub fn model_path(cache_dir: &Path, dim: usize) -> Result<PathBuf> {
    Ok(cache_dir.join(model_file_name(dim)?))
}

/// Document vectors exported from a trained model, keyed by tag.
///
/// On disk this is a JSON object mapping each tag to its vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedVectors {
    dim: usize,
    vectors: IndexMap<String, Vec<f32>>,
}

impl KeyedVectors {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, tag: impl Into<String>, vector: Vec<f32>) -> Result<()> {
        let tag = tag.into();
        if vector.len() != self.dim {
            return Err(CorpusError::VectorShape {
                tag,
                expected: self.dim,
                found: vector.len(),
            });
        }
        self.vectors.insert(tag, vector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Read a keyed-vector export, checking every vector has `dim` components.
    pub fn load(path: &Path, dim: usize) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| CorpusError::io(path, e))?;
        let raw: IndexMap<String, Vec<f32>> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| CorpusError::malformed(path, e))?;
        let mut model = Self::new(dim);
        for (tag, vector) in raw {
            model.insert(tag, vector)?;
        }
        info!(path = %path.display(), docs = model.len(), dim, "loaded document vectors");
        Ok(model)
    }

    /// Load the artefact that follows the `allDocs<DIM>D.model` convention.
    pub fn load_for_dim(cache_dir: &Path, dim: usize) -> Result<Self> {
        let path = model_path(cache_dir, dim)?;
        info!(path = %path.display(), "start loading the model");
        Self::load(&path, dim)
    }
}

impl EmbeddingModel for KeyedVectors {
    fn dim(&self) -> usize {
        self.dim
    }

    fn tags(&self) -> Vec<&str> {
        self.vectors.keys().map(String::as_str).collect()
    }

    fn vector(&self, tag: &str) -> Option<&[f32]> {
        self.vectors.get(tag).map(Vec::as_slice)
    }
}
