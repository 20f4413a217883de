//! Corpusync CLI — sync configured document sources into a file search store.
//!
//! Fetches each configured source, normalizes and chunks its content, and
//! reconciles the resulting chunk files against the remote store.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
