//! Labeled document pipeline: filter raw documents, normalize them on a
//! bounded worker pool with a disk cache in front, and stream tagged
//! documents to the embedding trainer.
//!
//! Emission order is unspecified. Every accepted document is emitted exactly
//! once, either from the cache or after its normalization task completes.

use std::{
    collections::HashSet,
    path::PathBuf,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, Stream, StreamExt};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, Semaphore},
    task::{AbortHandle, JoinError, JoinHandle},
    time::error::Elapsed,
};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::{
    config::Settings,
    data::{cache, DocumentSource, NormalizationCache, RawDocument},
    error::{CorpusError, Result},
    nlp::{Normalizer, TextNormalizer},
};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Token sequence plus the tag (source filename) it trains under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDocument {
    pub words: Vec<String>,
    pub tag: String,
}

/// Knobs for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Only documents with this `lang` are accepted.
    pub language: String,
    /// When false, raw text is split on whitespace and cache/pool are bypassed.
    pub normalize: bool,
    /// Worker pool size; values below 1 are treated as 1.
    pub workers: usize,
    /// Bound on one normalization task, counted from when it gets a worker.
    pub task_timeout: Duration,
    /// Tagged documents buffered ahead of the consumer.
    pub channel_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            normalize: true,
            workers: 1,
            task_timeout: Duration::from_secs(300),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            language: settings.language.clone(),
            workers: settings.workers,
            task_timeout: settings.task_timeout,
            ..Self::default()
        }
    }
}

/// Per-run counters, logged when a run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub read: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub cache_hits: usize,
    pub computed: usize,
    pub emitted: usize,
}

/// Restartable corpus of tagged documents.
pub struct LabeledDocuments {
    source: Arc<dyn DocumentSource>,
    normalizer: Arc<dyn Normalizer>,
    cache_dir: PathBuf,
    options: PipelineOptions,
    span: Span,
}

impl LabeledDocuments {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        cache_dir: impl Into<PathBuf>,
        options: PipelineOptions,
    ) -> Self {
        let span = info_span!(
            "labeled_documents",
            lang = %options.language,
            normalize = options.normalize,
            workers = options.workers.max(1),
        );
        Self {
            source,
            normalizer: Arc::new(TextNormalizer),
            cache_dir: cache_dir.into(),
            options,
            span,
        }
    }

    /// Swap the text normalizer handed to workers.
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Start a fresh pass over the source. Must be called inside a Tokio
    /// runtime.
    pub fn stream(&self) -> TaggedStream {
        let (tx, rx) = mpsc::channel(self.options.channel_capacity.max(1));
        let driver = Driver {
            source: Arc::clone(&self.source),
            normalizer: Arc::clone(&self.normalizer),
            cache_dir: self.cache_dir.clone(),
            options: self.options.clone(),
            tx,
            stats: PipelineStats::default(),
        };
        let handle = tokio::spawn(driver.run().instrument(self.span.clone()));
        TaggedStream {
            rx,
            driver: Some(handle),
        }
    }

    /// Run a full pass and collect every tagged document, or the first error.
    pub async fn collect(&self) -> Result<(Vec<TaggedDocument>, PipelineStats)> {
        let mut stream = self.stream();
        let mut docs = Vec::new();
        while let Some(item) = stream.next().await {
            docs.push(item?);
        }
        let stats = stream.finish().await?;
        Ok((docs, stats))
    }
}

/// Stream of tagged documents produced by one pipeline pass.
///
/// An `Err` item means the pass aborted; no further items follow.
pub struct TaggedStream {
    rx: mpsc::Receiver<Result<TaggedDocument>>,
    driver: Option<JoinHandle<PipelineStats>>,
}

impl TaggedStream {
    /// Wait for the driver to wind down and return its counters.
    pub async fn finish(mut self) -> Result<PipelineStats> {
        self.rx.close();
        match self.driver.take() {
            Some(handle) => handle
                .await
                .map_err(|err| CorpusError::DriverLost(err.to_string())),
            None => Ok(PipelineStats::default()),
        }
    }
}

impl Stream for TaggedStream {
    type Item = Result<TaggedDocument>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TaggedStream {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
    }
}

type WorkerOutput = std::result::Result<std::result::Result<String, JoinError>, Elapsed>;
type Finished = (String, std::result::Result<WorkerOutput, JoinError>);

/// In-flight normalization tasks. Completions surface through `running` in
/// the order they finish; dropping the set aborts whatever is still pending.
#[derive(Default)]
struct PendingTasks {
    running: FuturesUnordered<BoxFuture<'static, Finished>>,
    aborts: IndexMap<String, AbortHandle>,
}

impl PendingTasks {
    fn push(&mut self, filename: String, handle: JoinHandle<WorkerOutput>) {
        self.aborts.insert(filename.clone(), handle.abort_handle());
        self.running.push(async move { (filename, handle.await) }.boxed());
    }

    /// Next completed task, if one is ready right now.
    fn try_next(&mut self) -> Option<Finished> {
        let finished = self.running.next().now_or_never().flatten()?;
        self.aborts.swap_remove(&finished.0);
        Some(finished)
    }

    async fn next(&mut self) -> Option<Finished> {
        let finished = self.running.next().await?;
        self.aborts.swap_remove(&finished.0);
        Some(finished)
    }
}

impl Drop for PendingTasks {
    fn drop(&mut self) {
        for handle in self.aborts.values() {
            handle.abort();
        }
    }
}

struct Accepted {
    filename: String,
    language: String,
    plaintext: String,
}

struct Driver {
    source: Arc<dyn DocumentSource>,
    normalizer: Arc<dyn Normalizer>,
    cache_dir: PathBuf,
    options: PipelineOptions,
    tx: mpsc::Sender<Result<TaggedDocument>>,
    stats: PipelineStats,
}

impl Driver {
    async fn run(mut self) -> PipelineStats {
        match self.drive().await {
            Ok(()) => info!(stats = ?self.stats, "corpus pass complete"),
            Err(err) => {
                warn!(%err, "corpus pass aborted");
                let _ = self.tx.send(Err(err)).await;
            }
        }
        self.stats
    }

    async fn drive(&mut self) -> Result<()> {
        let cache = if self.options.normalize {
            Some(NormalizationCache::open(&self.cache_dir)?)
        } else {
            None
        };
        let pool = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut pending = PendingTasks::default();
        let mut seen = HashSet::new();

        let source = Arc::clone(&self.source);
        for doc in source.enumerate()? {
            self.stats.read += 1;
            let Some(doc) = self.accept(doc?) else {
                self.stats.filtered += 1;
                continue;
            };
            if !seen.insert(doc.filename.clone()) {
                debug!(filename = %doc.filename, "omitting duplicate filename");
                self.stats.duplicates += 1;
                continue;
            }

            let Some(cache) = &cache else {
                if !self.emit(doc.filename, &doc.plaintext).await {
                    return Ok(());
                }
                continue;
            };

            match cache.get(&doc.filename)? {
                Some(text) => {
                    debug!(filename = %doc.filename, "yielded from cache");
                    self.stats.cache_hits += 1;
                    if !self.emit(doc.filename, &text).await {
                        return Ok(());
                    }
                }
                None => {
                    let handle = self.submit(&pool, doc.plaintext, doc.language);
                    pending.push(doc.filename, handle);
                }
            }

            if !self.drain_finished(cache, &mut pending).await? {
                return Ok(());
            }
        }

        if let Some(cache) = &cache {
            self.drain_all(cache, &mut pending).await?;
        }
        Ok(())
    }

    fn accept(&self, doc: RawDocument) -> Option<Accepted> {
        let RawDocument {
            language,
            filename,
            plaintext,
            ..
        } = doc;
        let (Some(language), Some(filename)) = (language, filename) else {
            debug!("omitting document: lang or filename missing");
            return None;
        };
        if language != self.options.language {
            debug!(%filename, %language, "omitting document: language mismatch");
            return None;
        }
        let Some(plaintext) = plaintext else {
            debug!(%filename, "omitting document: plaintext missing");
            return None;
        };
        if let Err(err) = cache::validate_key(&filename) {
            debug!(%err, "omitting document: filename unusable as tag");
            return None;
        }
        Some(Accepted {
            filename,
            language,
            plaintext,
        })
    }

    fn submit(
        &self,
        pool: &Arc<Semaphore>,
        text: String,
        language: String,
    ) -> JoinHandle<WorkerOutput> {
        let pool = Arc::clone(pool);
        let normalizer = Arc::clone(&self.normalizer);
        let after = self.options.task_timeout;
        tokio::spawn(async move {
            let _permit = pool.acquire_owned().await;
            let work = tokio::task::spawn_blocking(move || normalizer.normalize(&text, &language));
            tokio::time::timeout(after, work).await
        })
    }

    /// Collect tasks that already finished without blocking the producer.
    async fn drain_finished(
        &mut self,
        cache: &NormalizationCache,
        pending: &mut PendingTasks,
    ) -> Result<bool> {
        while let Some((filename, joined)) = pending.try_next() {
            let text = resolve(&filename, joined, self.options.task_timeout)?;
            if !self.store_and_emit(cache, filename, text).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Await every outstanding task as it completes.
    async fn drain_all(
        &mut self,
        cache: &NormalizationCache,
        pending: &mut PendingTasks,
    ) -> Result<()> {
        while let Some((filename, joined)) = pending.next().await {
            let text = resolve(&filename, joined, self.options.task_timeout)?;
            if !self.store_and_emit(cache, filename, text).await? {
                return Ok(());
            }
        }
        Ok(())
    }

    async fn store_and_emit(
        &mut self,
        cache: &NormalizationCache,
        filename: String,
        text: String,
    ) -> Result<bool> {
        cache.put(&filename, &text)?;
        self.stats.computed += 1;
        debug!(%filename, "yielded from calculation");
        Ok(self.emit(filename, &text).await)
    }

    /// Send one document downstream; `false` once the consumer is gone.
    async fn emit(&mut self, tag: String, text: &str) -> bool {
        let doc = TaggedDocument {
            words: text.split_whitespace().map(str::to_string).collect(),
            tag,
        };
        self.stats.emitted += 1;
        self.tx.send(Ok(doc)).await.is_ok()
    }
}

fn resolve(
    filename: &str,
    joined: std::result::Result<WorkerOutput, JoinError>,
    after: Duration,
) -> Result<String> {
    match joined {
        Ok(Ok(Ok(text))) => Ok(text),
        Ok(Err(_)) => Err(CorpusError::TaskTimeout {
            filename: filename.to_string(),
            after,
        }),
        Ok(Ok(Err(err))) | Err(err) => Err(CorpusError::WorkerLost {
            filename: filename.to_string(),
            reason: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemorySource;

    fn doc(lang: &str, filename: &str, text: &str) -> RawDocument {
        RawDocument {
            language: Some(lang.into()),
            filename: Some(filename.into()),
            plaintext: Some(text.into()),
            cited_by: None,
        }
    }

    #[tokio::test]
    async fn disabled_normalization_splits_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemorySource::new(vec![doc("en", "a", "The quick, brown fox")]);
        let options = PipelineOptions {
            normalize: false,
            ..PipelineOptions::default()
        };
        let pipeline = LabeledDocuments::new(Arc::new(source), dir.path().join("cache"), options);
        let (docs, stats) = pipeline.collect().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].words, vec!["The", "quick,", "brown", "fox"]);
        assert_eq!(stats.cache_hits + stats.computed, 0);
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn duplicate_filenames_emit_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemorySource::new(vec![
            doc("en", "same", "first version of the text"),
            doc("en", "same", "second version of the text"),
        ]);
        let pipeline =
            LabeledDocuments::new(Arc::new(source), dir.path(), PipelineOptions::default());
        let (docs, stats) = pipeline.collect().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(stats.duplicates, 1);
    }

    #[tokio::test]
    async fn pending_tasks_are_harvested_without_waiting() {
        let mut pending = PendingTasks::default();
        assert!(pending.try_next().is_none());

        let gate = Arc::new(tokio::sync::Notify::new());
        let wait = Arc::clone(&gate);
        pending.push(
            "blocked".to_string(),
            tokio::spawn(async move {
                wait.notified().await;
                Ok(Ok("late".to_string()))
            }),
        );
        let done = tokio::spawn(async { Ok(Ok("early".to_string())) });
        while !done.is_finished() {
            tokio::task::yield_now().await;
        }
        pending.push("done".to_string(), done);

        let (filename, joined) = pending.try_next().unwrap();
        assert_eq!(filename, "done");
        assert_eq!(resolve(&filename, joined, Duration::ZERO).unwrap(), "early");
        assert!(pending.try_next().is_none());
        assert_eq!(pending.aborts.len(), 1);

        gate.notify_one();
        let (filename, _) = pending.next().await.unwrap();
        assert_eq!(filename, "blocked");
        assert!(pending.aborts.is_empty());
    }

    #[test]
    fn elapsed_task_is_a_timeout() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let joined = runtime.block_on(async {
            tokio::spawn(async {
                let work = tokio::task::spawn_blocking(|| {
                    std::thread::sleep(Duration::from_millis(200));
                    String::new()
                });
                tokio::time::timeout(Duration::from_millis(10), work).await
            })
            .await
        });
        assert!(matches!(
            resolve("doc", joined, Duration::from_millis(10)),
            Err(CorpusError::TaskTimeout { .. })
        ));
    }

    #[test]
    fn worker_panic_is_reported_as_lost() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let joined = runtime.block_on(async {
            tokio::spawn(async {
                let work = tokio::task::spawn_blocking(|| -> String { panic!("boom") });
                tokio::time::timeout(Duration::from_secs(5), work).await
            })
            .await
        });
        assert!(matches!(
            resolve("doc", joined, Duration::from_secs(5)),
            Err(CorpusError::WorkerLost { .. })
        ));
    }
}
