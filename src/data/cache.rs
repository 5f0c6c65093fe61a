//! Disk-backed cache of normalized document text, one file per filename.

use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, info_span, Span};

use crate::error::{CorpusError, Result};

/// Scratch sub-directory for entries being written.
const PARTIAL_DIR: &str = ".partial";

/// Distinguishes scratch files of concurrent writers inside one process.
static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Filename → normalized text store.
///
/// Entries are append-only: once a filename has a value it is never
/// rewritten, even if the raw document later changes.
#[derive(Debug, Clone)]
pub struct NormalizationCache {
    dir: PathBuf,
    bootstrap: HashSet<String>,
    span: Span,
}

impl NormalizationCache {
    /// Open (or create) the cache directory and snapshot its listing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let span = info_span!("normalization_cache", dir = %dir.display());
        let _guard = span.enter();

        let mut bootstrap = HashSet::new();
        if dir.exists() {
            for entry in std::fs::read_dir(&dir).map_err(|e| CorpusError::io(&dir, e))? {
                let entry = entry.map_err(|e| CorpusError::io(&dir, e))?;
                let is_file = entry
                    .file_type()
                    .map_err(|e| CorpusError::io(entry.path(), e))?
                    .is_file();
                if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                    bootstrap.insert(name.to_string());
                }
            }
            debug!(entries = bootstrap.len(), "read key set from cache directory");
        } else {
            std::fs::create_dir_all(&dir).map_err(|e| CorpusError::io(&dir, e))?;
            debug!("cache is empty; starting with empty key set");
        }

        drop(_guard);
        Ok(Self {
            dir,
            bootstrap,
            span,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filenames present when the cache was opened.
    ///
    /// A hint only; [`NormalizationCache::get`] always checks the disk.
    pub fn bootstrap_keys(&self) -> &HashSet<String> {
        &self.bootstrap
    }

    /// Read the cached text for `filename`, if an entry exists on disk.
    pub fn get(&self, filename: &str) -> Result<Option<String>> {
        validate_key(filename)?;
        let _guard = self.span.enter();
        let path = self.dir.join(filename);
        let body = match std::fs::read_to_string(&path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if self.bootstrap.contains(filename) {
                    debug!(%filename, "listed entry vanished from cache");
                }
                return Ok(None);
            }
            Err(err) => return Err(CorpusError::io(path, err)),
        };
        let text: String = serde_json::from_str(&body)
            .map_err(|source| CorpusError::CacheEncoding { path, source })?;
        Ok(Some(text))
    }

    /// Store `text` for `filename`. Returns `false` when an entry already
    /// existed and was left untouched.
    pub fn put(&self, filename: &str, text: &str) -> Result<bool> {
        validate_key(filename)?;
        let _guard = self.span.enter();
        let path = self.dir.join(filename);
        if path.exists() {
            debug!(%filename, "cache entry already present");
            return Ok(false);
        }

        let partial_dir = self.dir.join(PARTIAL_DIR);
        std::fs::create_dir_all(&partial_dir).map_err(|e| CorpusError::io(&partial_dir, e))?;
        let partial = partial_dir.join(format!(
            "{filename}.{}.{}",
            std::process::id(),
            PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let body = serde_json::to_string(text).map_err(|source| CorpusError::CacheEncoding {
            path: partial.clone(),
            source,
        })?;
        std::fs::write(&partial, body).map_err(|e| CorpusError::io(&partial, e))?;
        let linked = std::fs::hard_link(&partial, &path);
        std::fs::remove_file(&partial).map_err(|e| CorpusError::io(&partial, e))?;
        match linked {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(%filename, "cache entry written concurrently; keeping it");
                return Ok(false);
            }
            Err(err) => return Err(CorpusError::io(path, err)),
        }
        debug!(%filename, "cached normalized text");
        Ok(true)
    }
}

/// Reject filenames that cannot name a single file inside the cache dir.
pub fn validate_key(filename: &str) -> Result<()> {
    let unsafe_name = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename == PARTIAL_DIR
        || filename.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(CorpusError::InvalidKey(filename.to_string()));
    }
    Ok(())
}
