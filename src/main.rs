//! Entry point wiring CLI dispatch to the corpus library.

mod cli;
mod logging;

use anyhow::Result;
use cli::Cli;
use doc2vec_corpus::config::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing()?;
    let cli = Cli::parse();
    let settings = Settings::load()?;

    info!(?cli, "starting command");
    cli.dispatch(settings).await
}
