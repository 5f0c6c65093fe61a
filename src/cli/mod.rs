//! Command-line interface wiring for doc2vec-corpus.

use anyhow::Result;
use clap::{Parser, Subcommand};
use doc2vec_corpus::config::Settings;

pub mod assemble;
pub mod corpus;
pub mod model_path;
pub mod normalize;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(author, version, about = "Labeled corpus builder for document embeddings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parse CLI arguments from the environment.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Dispatch the selected sub-command.
    pub async fn dispatch(self, settings: Settings) -> Result<()> {
        match self.command {
            Commands::Corpus(args) => corpus::run(args, settings).await,
            Commands::Normalize(args) => normalize::run(args, settings).await,
            Commands::Assemble(args) => assemble::run(args, settings).await,
            Commands::ModelPath(args) => model_path::run(args, settings).await,
        }
    }
}

/// Supported sub-commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build tagged training documents from the raw corpus.
    Corpus(corpus::Args),
    /// Normalize a single text and print the result.
    Normalize(normalize::Args),
    /// Join document vectors with citation counts into a feature/label table.
    Assemble(assemble::Args),
    /// Print where the model artefact for a dimensionality lives.
    ModelPath(model_path::Args),
}
