//! Runtime configuration utilities for doc2vec-corpus.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

/// Sub-directory of the cache root holding one file per normalized document.
pub const NORMALIZED_DOCS_DIR: &str = "normalizedDocs";

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory holding one JSON record per document.
    pub corpus_dir: PathBuf,
    /// Root folder for normalized text and model artefacts.
    pub cache_dir: PathBuf,
    /// Root folder for generated corpora.
    pub outputs_dir: PathBuf,
    /// Language code documents must carry to enter the corpus.
    pub language: String,
    /// Size of the normalization worker pool.
    pub workers: usize,
    /// Upper bound on waiting for a single normalization task.
    pub task_timeout: Duration,
    /// Default embedding dimensionality for the assembler.
    pub embedding_dim: usize,
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let corpus_dir = env::var("CORPUS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/json"));
        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./cache"));
        let outputs_dir = env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./outputs"));
        let language = env::var("CORPUS_LANG").unwrap_or_else(|_| "en".to_string());
        let workers = env::var("NORMALIZE_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1usize)
            .max(1);
        let task_timeout = env::var("NORMALIZE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));
        let embedding_dim = env::var("EMBEDDING_DIM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(600);

        std::fs::create_dir_all(&cache_dir).context("creating cache dir")?;
        std::fs::create_dir_all(&outputs_dir).context("creating outputs dir")?;

        Ok(Self {
            corpus_dir,
            cache_dir,
            outputs_dir,
            language,
            workers,
            task_timeout,
            embedding_dim,
        })
    }

    /// Convenience helper for derived cache path segments.
    pub fn join_cache<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.cache_dir.join(path)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }

    /// Directory backing the normalization cache.
    pub fn normalized_cache_dir(&self) -> PathBuf {
        self.join_cache(NORMALIZED_DOCS_DIR)
    }
}
