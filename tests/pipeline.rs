use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use doc2vec_corpus::{
    data::{InMemorySource, JsonDirSource, NormalizationCache, RawDocument},
    nlp::{normalize, Normalizer},
    pipeline::{LabeledDocuments, PipelineOptions},
    CorpusError,
};

#[derive(Default)]
struct CountingNormalizer {
    calls: AtomicUsize,
}

impl Normalizer for CountingNormalizer {
    fn normalize(&self, text: &str, language: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        normalize(text, language)
    }
}

struct SlowNormalizer;

impl Normalizer for SlowNormalizer {
    fn normalize(&self, text: &str, _language: &str) -> String {
        std::thread::sleep(Duration::from_millis(1_000));
        text.to_string()
    }
}

struct PausingNormalizer(Duration);

impl Normalizer for PausingNormalizer {
    fn normalize(&self, text: &str, language: &str) -> String {
        std::thread::sleep(self.0);
        normalize(text, language)
    }
}

struct PanickingNormalizer;

impl Normalizer for PanickingNormalizer {
    fn normalize(&self, _text: &str, _language: &str) -> String {
        panic!("worker crashed")
    }
}

fn doc(lang: Option<&str>, filename: Option<&str>, text: Option<&str>) -> RawDocument {
    RawDocument {
        language: lang.map(Into::into),
        filename: filename.map(Into::into),
        plaintext: text.map(Into::into),
        cited_by: None,
    }
}

fn en(filename: &str, text: &str) -> RawDocument {
    doc(Some("en"), Some(filename), Some(text))
}

fn pipeline(docs: Vec<RawDocument>, cache_dir: &std::path::Path) -> LabeledDocuments {
    LabeledDocuments::new(
        Arc::new(InMemorySource::new(docs)),
        cache_dir,
        PipelineOptions::default(),
    )
}

#[tokio::test]
async fn incomplete_or_foreign_documents_are_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![
        doc(None, Some("no-lang"), Some("some useful text")),
        doc(Some("en"), None, Some("some useful text")),
        doc(Some("en"), Some("no-text"), None),
        doc(Some("de"), Some("german"), Some("einige nützliche Wörter")),
        doc(Some("en"), Some("../escape"), Some("some useful text")),
        en("kept", "some useful text"),
    ];
    let (out, stats) = pipeline(docs, dir.path()).collect().await.unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].tag, "kept");
    assert_eq!(stats.read, 6);
    assert_eq!(stats.filtered, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_accepted_document_is_emitted_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<_> = (0..64)
        .map(|i| en(&format!("doc-{i}"), "Several documents describe embedding models"))
        .collect();
    let options = PipelineOptions {
        workers: 4,
        ..PipelineOptions::default()
    };
    let pipeline = LabeledDocuments::new(Arc::new(InMemorySource::new(docs)), dir.path(), options);

    let (out, stats) = pipeline.collect().await.unwrap();
    let tags: HashSet<_> = out.iter().map(|d| d.tag.clone()).collect();
    assert_eq!(out.len(), 64);
    assert_eq!(tags.len(), 64);
    assert!((0..64).all(|i| tags.contains(&format!("doc-{i}"))));
    assert_eq!(stats.computed, 64);
    assert!(out
        .iter()
        .all(|d| d.words == ["Several", "document", "describe", "embedding", "model"]));
}

#[tokio::test]
async fn second_run_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![en("paper-1", "The quick brown fox jumps")];

    let first = Arc::new(CountingNormalizer::default());
    let (out, _) = pipeline(docs.clone(), dir.path())
        .with_normalizer(first.clone())
        .collect()
        .await
        .unwrap();
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    assert_eq!(out[0].words, ["quick", "brown", "jump"]);

    let second = Arc::new(CountingNormalizer::default());
    let (out, stats) = pipeline(docs, dir.path())
        .with_normalizer(second.clone())
        .collect()
        .await
        .unwrap();
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(out[0].tag, "paper-1");
    assert_eq!(out[0].words, ["quick", "brown", "jump"]);
}

#[tokio::test]
async fn entries_written_by_another_instance_are_hits() {
    let dir = tempfile::tempdir().unwrap();
    NormalizationCache::open(dir.path())
        .unwrap()
        .put("precomputed", "cached words")
        .unwrap();

    let counter = Arc::new(CountingNormalizer::default());
    let (out, _) = pipeline(vec![en("precomputed", "raw body text")], dir.path())
        .with_normalizer(counter.clone())
        .collect()
        .await
        .unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    assert_eq!(out[0].words, ["cached", "words"]);
}

#[tokio::test]
async fn cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    pipeline(vec![en("persisted", "Multiple citations")], dir.path())
        .collect()
        .await
        .unwrap();

    let reopened = NormalizationCache::open(dir.path()).unwrap();
    assert!(reopened.bootstrap_keys().contains("persisted"));
    assert_eq!(
        reopened.get("persisted").unwrap().as_deref(),
        Some("Multiple citation")
    );
}

#[tokio::test]
async fn malformed_file_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("json");
    std::fs::create_dir_all(&json).unwrap();
    std::fs::write(json.join("broken.json"), "{\"lang\": ").unwrap();

    let pipeline = LabeledDocuments::new(
        Arc::new(JsonDirSource::new(&json)),
        dir.path().join("cache"),
        PipelineOptions::default(),
    );
    let err = pipeline.collect().await.unwrap_err();
    assert!(matches!(err, CorpusError::Malformed { .. }));
}

#[tokio::test]
async fn stuck_worker_times_out_instead_of_hanging() {
    let dir = tempfile::tempdir().unwrap();
    let options = PipelineOptions {
        task_timeout: Duration::from_millis(50),
        ..PipelineOptions::default()
    };
    let pipeline = LabeledDocuments::new(
        Arc::new(InMemorySource::new(vec![en("slow", "some text here")])),
        dir.path(),
        options,
    )
    .with_normalizer(Arc::new(SlowNormalizer));

    let err = pipeline.collect().await.unwrap_err();
    assert!(matches!(err, CorpusError::TaskTimeout { ref filename, .. } if filename == "slow"));
    assert_eq!(NormalizationCache::open(dir.path()).unwrap().get("slow").unwrap(), None);
}

#[tokio::test]
async fn timeout_bounds_each_task_not_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<_> = (0..8)
        .map(|i| en(&format!("queued-{i}"), "several queued documents"))
        .collect();
    let options = PipelineOptions {
        workers: 1,
        task_timeout: Duration::from_millis(250),
        ..PipelineOptions::default()
    };
    let pipeline = LabeledDocuments::new(Arc::new(InMemorySource::new(docs)), dir.path(), options)
        .with_normalizer(Arc::new(PausingNormalizer(Duration::from_millis(50))));

    let (out, stats) = pipeline.collect().await.unwrap();
    assert_eq!(out.len(), 8);
    assert_eq!(stats.computed, 8);
}

#[tokio::test]
async fn crashed_worker_is_an_explicit_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(vec![en("crash", "some text here")], dir.path())
        .with_normalizer(Arc::new(PanickingNormalizer));

    let err = pipeline.collect().await.unwrap_err();
    assert!(matches!(err, CorpusError::WorkerLost { ref filename, .. } if filename == "crash"));
}

#[tokio::test]
async fn stream_can_be_restarted() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(vec![en("a", "alpha words"), en("b", "beta words")], dir.path());
    let (first, _) = pipeline.collect().await.unwrap();
    let (second, stats) = pipeline.collect().await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(stats.cache_hits, 2);
}
