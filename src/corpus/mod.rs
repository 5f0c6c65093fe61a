//! Feature/label corpus assembled from document vectors and citation counts.

pub mod model;

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use tracing::{debug, info, info_span, Span};

use crate::{
    data::source::read_record,
    error::{CorpusError, Result},
};

pub use model::{model_path, EmbeddingModel, KeyedVectors};

/// Only documents in this language enter the citation corpus.
pub const CORPUS_LANGUAGE: &str = "en";

/// How the "was cited" label is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelEncoding {
    /// `0` not cited, `1` cited.
    #[default]
    Binary,
    /// `[0, 1]` not cited, `[1, 0]` cited.
    OneHot,
}

/// Labels aligned row-for-row with the feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    Binary(Array1<i32>),
    OneHot(Array2<i32>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Binary(labels) => labels.len(),
            Labels::OneHot(labels) => labels.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label components of one row.
    pub fn row(&self, idx: usize) -> Vec<i32> {
        match self {
            Labels::Binary(labels) => vec![labels[idx]],
            Labels::OneHot(labels) => labels.row(idx).to_vec(),
        }
    }
}

/// Aligned tags, document vectors and citation labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub tags: Vec<String>,
    pub features: Array2<f32>,
    pub labels: Labels,
}

/// A document counts as cited once it has at least one citation.
pub fn is_cited(cited_by: i64) -> bool {
    cited_by > 0
}

/// Encode "was cited" flags into label arrays.
pub fn encode_labels(cited: &[bool], encoding: LabelEncoding) -> Result<Labels> {
    let labels = match encoding {
        LabelEncoding::Binary => Labels::Binary(cited.iter().map(|&c| i32::from(c)).collect()),
        LabelEncoding::OneHot => {
            let flat: Vec<i32> = cited
                .iter()
                .flat_map(|&c| if c { [1, 0] } else { [0, 1] })
                .collect();
            Labels::OneHot(Array2::from_shape_vec((cited.len(), 2), flat)?)
        }
    };
    Ok(labels)
}

/// Joins model tags back to their raw JSON records.
#[derive(Debug, Clone)]
pub struct CorpusAssembler {
    json_dir: PathBuf,
    encoding: LabelEncoding,
    span: Span,
}

impl CorpusAssembler {
    pub fn new(json_dir: impl Into<PathBuf>, encoding: LabelEncoding) -> Self {
        let json_dir = json_dir.into();
        let span = info_span!("corpus_assembler", dir = %json_dir.display(), ?encoding);
        Self {
            json_dir,
            encoding,
            span,
        }
    }

    /// `<json_dir>/<tag>.json`.
    pub fn record_path(&self, tag: &str) -> PathBuf {
        self.json_dir.join(format!("{tag}.json"))
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    /// Build the corpus for every tag the model knows.
    ///
    /// Tags whose record is not English or has no `citedBy` are discarded; a
    /// tag without a record at all is an error.
    pub fn assemble(&self, model: &dyn EmbeddingModel) -> Result<Corpus> {
        let _guard = self.span.enter();
        let dim = model.dim();
        let mut tags = Vec::new();
        let mut features = Vec::new();
        let mut cited = Vec::new();

        info!("building corpus");
        for tag in model.tags() {
            let path = self.record_path(tag);
            if !path.is_file() {
                return Err(CorpusError::MissingRecord {
                    tag: tag.to_string(),
                    path,
                });
            }
            let record = read_record(&path)?;
            let cited_by = match (record.language.as_deref(), record.cited_by) {
                (Some(CORPUS_LANGUAGE), Some(cited_by)) => cited_by,
                _ => {
                    debug!(%tag, "discarded from corpus");
                    continue;
                }
            };
            let Some(vector) = model.vector(tag) else {
                debug!(%tag, "no vector for tag; discarded from corpus");
                continue;
            };
            if vector.len() != dim {
                return Err(CorpusError::VectorShape {
                    tag: tag.to_string(),
                    expected: dim,
                    found: vector.len(),
                });
            }

            features.extend_from_slice(vector);
            cited.push(is_cited(cited_by));
            tags.push(tag.to_string());
            debug!(%tag, "absorbed into corpus");
        }

        let rows = tags.len();
        let features = Array2::from_shape_vec((rows, dim), features)?;
        let labels = encode_labels(&cited, self.encoding)?;
        info!(rows, dim, "corpus complete");
        Ok(Corpus {
            tags,
            features,
            labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn binary_labels() {
        let labels = encode_labels(&[false, true], LabelEncoding::Binary).unwrap();
        assert_eq!(labels, Labels::Binary(array![0, 1]));
    }

    #[test]
    fn one_hot_labels() {
        let labels = encode_labels(&[false, true], LabelEncoding::OneHot).unwrap();
        assert_eq!(labels, Labels::OneHot(array![[0, 1], [1, 0]]));
        assert_eq!(labels.row(1), vec![1, 0]);
    }

    #[test]
    fn zero_citations_is_not_cited() {
        assert!(!is_cited(0));
        assert!(is_cited(1));
        assert!(is_cited(3));
    }
}
