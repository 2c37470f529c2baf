use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fetchrelay")]
#[command(about = "Archival download worker", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $FETCHRELAY_CONFIG or config/fetchrelay.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the supervised worker pool
    Run,
    /// Run a single job in-process and exit
    Once,
    /// Entry point of a supervised child process
    #[command(hide = true)]
    Job,
}
