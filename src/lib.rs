pub mod cli;
pub mod commands;
pub mod config;
pub mod doc_processor;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod state;

use clap::Parser;

/// Parse the command line, install logging and run the chosen action.
pub async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init(&cli.settings.log_level);
    cli.run().await
}
