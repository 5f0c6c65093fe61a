//! CLI entry-point for normalizing a single text.

use anyhow::Result;
use clap::Args as ClapArgs;
use doc2vec_corpus::{config::Settings, nlp};
use tokio::io::AsyncReadExt;
use tracing::instrument;

/// Args for the `normalize` command.
#[derive(Debug, Clone, ClapArgs)]
pub struct Args {
    /// Text to normalize; read from stdin when omitted.
    pub text: Option<String>,
    /// Language code of the text (defaults to CORPUS_LANG).
    #[arg(long)]
    pub lang: Option<String>,
}

#[instrument(skip(settings))]
pub async fn run(args: Args, settings: Settings) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    let lang = args.lang.unwrap_or(settings.language);
    println!("{}", nlp::normalize(&text, &lang));
    Ok(())
}
