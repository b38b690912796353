//! Entry point for the fetchzip CLI.
//!
//! Runs on a single-threaded runtime: the download and extraction phases are
//! sequential and nothing here benefits from worker threads.

use anyhow::{Context, Result};
use clap::Parser;

use fetchzip::{Cli, Config, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::from(&cli);
    tracing::debug!(?config, "resolved configuration");

    let summary = fetchzip::run(&config)
        .await
        .with_context(|| format!("failed to fetch and unpack {}", config.url))?;

    tracing::info!(entries = summary.extracted.len(), "done");

    Ok(())
}
