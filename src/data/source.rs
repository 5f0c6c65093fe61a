//! Document enumeration over a directory of JSON records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CorpusError, Result};

const RECORD_EXTENSION: &str = "json";

/// One raw document as stored on disk.
///
/// Every field is optional at parse time; the pipeline decides what is
/// required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(rename = "lang", default)]
    pub language: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub plaintext: Option<String>,
    #[serde(rename = "citedBy", default)]
    pub cited_by: Option<i64>,
}

/// Boxed lazy sequence of parsed documents.
pub type DocumentIter<'a> = Box<dyn Iterator<Item = Result<RawDocument>> + Send + 'a>;

/// Anything that can enumerate raw documents.
///
/// Every call to [`DocumentSource::enumerate`] starts a fresh pass.
pub trait DocumentSource: Send + Sync {
    fn enumerate(&self) -> Result<DocumentIter<'_>>;
}

/// Reads every `*.json` file directly inside a directory, in file-name order.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for JsonDirSource {
    fn enumerate(&self) -> Result<DocumentIter<'_>> {
        if !self.root.is_dir() {
            return Err(CorpusError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "corpus directory missing"),
            ));
        }
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    let is_record = entry.file_type().is_file()
                        && entry.path().extension().and_then(|s| s.to_str())
                            == Some(RECORD_EXTENSION);
                    is_record.then(|| read_record(entry.path()))
                }
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    Some(Err(CorpusError::io(path, err.into())))
                }
            });
        Ok(Box::new(walker))
    }
}

/// Parse a single JSON record from disk.
pub fn read_record(path: &Path) -> Result<RawDocument> {
    let body = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let doc = serde_json::from_str(&body).map_err(|e| CorpusError::malformed(path, e))?;
    debug!(path = %path.display(), "parsed document");
    Ok(doc)
}

/// Fixed set of documents, for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    docs: Vec<RawDocument>,
}

impl InMemorySource {
    pub fn new(docs: Vec<RawDocument>) -> Self {
        Self { docs }
    }
}

impl DocumentSource for InMemorySource {
    fn enumerate(&self) -> Result<DocumentIter<'_>> {
        Ok(Box::new(self.docs.iter().cloned().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_cited_by_parses_as_absent() {
        let doc: RawDocument =
            serde_json::from_str(r#"{"lang":"en","filename":"a","plaintext":"x","citedBy":null}"#)
                .unwrap();
        assert_eq!(doc.cited_by, None);
        assert_eq!(doc.language.as_deref(), Some("en"));
    }

    #[test]
    fn only_json_files_are_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("one.json"),
            r#"{"lang":"en","filename":"one","plaintext":"text"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a record").unwrap();
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let source = JsonDirSource::new(dir.path());
        let docs: Vec<_> = source
            .enumerate()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].filename.as_deref(), Some("one"));
    }

    #[test]
    fn records_are_read_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            std::fs::write(
                dir.path().join(format!("{name}.json")),
                format!(r#"{{"filename":"{name}"}}"#),
            )
            .unwrap();
        }
        let names: Vec<_> = JsonDirSource::new(dir.path())
            .enumerate()
            .unwrap()
            .map(|doc| doc.unwrap().filename.unwrap())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn malformed_file_propagates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let source = JsonDirSource::new(dir.path());
        let first = source.enumerate().unwrap().next().unwrap();
        assert!(matches!(first, Err(CorpusError::Malformed { .. })));
    }

    #[test]
    fn enumeration_restarts_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonDirSource::new(dir.path());
        assert_eq!(source.enumerate().unwrap().count(), 0);
        std::fs::write(dir.path().join("late.json"), r#"{"filename":"late"}"#).unwrap();
        assert_eq!(source.enumerate().unwrap().count(), 1);
    }
}
