//! CLI entry-point for resolving the model artefact path.

use anyhow::Result;
use clap::Args as ClapArgs;
use doc2vec_corpus::{config::Settings, corpus::model_path};
use tracing::instrument;

/// Args for the `model-path` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Embedding dimensionality: 100, 300 or 600 (defaults to EMBEDDING_DIM).
    #[arg(long)]
    pub dim: Option<usize>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let dim = args.dim.unwrap_or(settings.embedding_dim);
    let path = model_path(&settings.cache_dir, dim)?;
    println!("{}", path.display());
    Ok(())
}
