//! CLI entry-point for building tagged training documents.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use doc2vec_corpus::{
    config::Settings,
    data::JsonDirSource,
    pipeline::{LabeledDocuments, PipelineOptions, PipelineStats, TaggedDocument},
};
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, instrument};

/// Args for the `corpus` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Language code documents must carry (defaults to CORPUS_LANG).
    #[arg(long)]
    pub lang: Option<String>,
    /// Normalization worker count (defaults to NORMALIZE_WORKERS).
    #[arg(long)]
    pub workers: Option<usize>,
    /// Emit raw whitespace-split text, bypassing normalization and the cache.
    #[arg(long)]
    pub no_normalize: bool,
    /// Per-task wait bound in seconds (defaults to NORMALIZE_TIMEOUT_SECS).
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Output JSONL path (defaults to outputs/tagged_docs.jsonl).
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// One line of the trainer input, in gensim's `TaggedDocument` shape.
#[derive(Serialize)]
struct TrainingLine<'a> {
    words: &'a [String],
    tags: [&'a str; 1],
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let mut options = PipelineOptions::from_settings(&settings);
    if let Some(lang) = args.lang {
        options.language = lang;
    }
    if let Some(workers) = args.workers {
        options.workers = workers.max(1);
    }
    if let Some(secs) = args.timeout_secs {
        options.task_timeout = Duration::from_secs(secs);
    }
    options.normalize = !args.no_normalize;

    let source = Arc::new(JsonDirSource::new(&settings.corpus_dir));
    let pipeline = LabeledDocuments::new(source, settings.normalized_cache_dir(), options);
    let output = args
        .output
        .unwrap_or_else(|| settings.join_output("tagged_docs.jsonl"));
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let partial = output.with_extension("jsonl.partial");
    let stats = match write_documents(&pipeline, &partial).await {
        Ok(stats) => stats,
        Err(err) => {
            let _ = std::fs::remove_file(&partial);
            return Err(err);
        }
    };
    std::fs::rename(&partial, &output)
        .with_context(|| format!("moving corpus into place at {}", output.display()))?;

    info!(
        path = %output.display(),
        emitted = stats.emitted,
        cache_hits = stats.cache_hits,
        computed = stats.computed,
        filtered = stats.filtered,
        "wrote tagged documents"
    );
    Ok(())
}

async fn write_documents(pipeline: &LabeledDocuments, path: &Path) -> Result<PipelineStats> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut stream = pipeline.stream();
    while let Some(item) = stream.next().await {
        let doc: TaggedDocument = item.context("building tagged documents")?;
        let line = TrainingLine {
            words: &doc.words,
            tags: [doc.tag.as_str()],
        };
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
    }
    let stats = stream.finish().await?;
    writer.flush()?;
    Ok(stats)
}
