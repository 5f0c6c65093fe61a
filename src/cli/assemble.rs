//! CLI entry-point for assembling the citation corpus.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use doc2vec_corpus::{
    config::Settings,
    corpus::{Corpus, CorpusAssembler, KeyedVectors, LabelEncoding, Labels},
};
use tracing::{info, instrument};

/// Args for the `assemble` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Embedding dimensionality: 100, 300 or 600 (defaults to EMBEDDING_DIM).
    #[arg(long)]
    pub dim: Option<usize>,
    /// Encode labels as two-class one-hot vectors instead of 0/1.
    #[arg(long)]
    pub regression: bool,
    /// Output CSV path (defaults to outputs/corpus_<dim>d.csv).
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let dim = args.dim.unwrap_or(settings.embedding_dim);
    let model = KeyedVectors::load_for_dim(&settings.cache_dir, dim)
        .with_context(|| format!("loading {dim}-dimensional model"))?;
    let encoding = if args.regression {
        LabelEncoding::OneHot
    } else {
        LabelEncoding::Binary
    };

    let corpus = CorpusAssembler::new(&settings.corpus_dir, encoding).assemble(&model)?;
    let output = args
        .output
        .unwrap_or_else(|| settings.join_output(format!("corpus_{dim}d.csv")));
    write_csv(&corpus, &output)?;
    info!(path = %output.display(), rows = corpus.tags.len(), "wrote corpus");
    Ok(())
}

fn write_csv(corpus: &Corpus, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["tag".to_string()];
    match &corpus.labels {
        Labels::Binary(_) => header.push("cited".to_string()),
        Labels::OneHot(_) => {
            header.push("cited".to_string());
            header.push("not_cited".to_string());
        }
    }
    header.extend((0..corpus.features.ncols()).map(|i| format!("f{i}")));
    writer.write_record(&header)?;

    for (idx, tag) in corpus.tags.iter().enumerate() {
        let mut record = vec![tag.clone()];
        record.extend(corpus.labels.row(idx).iter().map(i32::to_string));
        record.extend(corpus.features.row(idx).iter().map(f32::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
