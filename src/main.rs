mod cli;
mod runtime;

use clap::Parser;
use cli::{Cli, Commands};
use fetchrelay::config::Config;
use fetchrelay::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    observability::init_tracing();

    let cli = Cli::parse();
    let config = Config::load(cli.config.clone())?;

    match cli.command {
        Commands::Run if config.worker.debug_once => runtime::run_once(&config).await?,
        Commands::Run => runtime::supervise(&config, cli.config.as_deref()).await?,
        Commands::Once | Commands::Job => runtime::run_once(&config).await?,
    }

    Ok(())
}
