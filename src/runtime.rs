use std::ffi::OsString;
use std::path::Path;
use tracing::info;

use fetchrelay::config::Config;
use fetchrelay::supervisor::{self, ProcessLauncher, SupervisorOptions, WorkerSupervisor};
use fetchrelay::worker::JobPipeline;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Supervise child processes until interrupted
pub async fn supervise(config: &Config, config_path: Option<&Path>) -> Result<(), AnyError> {
    let mut args: Vec<OsString> = Vec::new();
    if let Some(path) = config_path {
        args.push("--config".into());
        args.push(path.into());
    }
    args.push("job".into());

    let launcher = ProcessLauncher::current_exe(args)?;
    let supervisor = WorkerSupervisor::new(launcher, SupervisorOptions::from_config(&config.worker));

    supervisor.run(supervisor::shutdown_signal()).await;
    Ok(())
}

/// Run exactly one pipeline execution in this process
pub async fn run_once(config: &Config) -> Result<(), AnyError> {
    let pipeline = JobPipeline::from_config(config)?;
    let outcome = pipeline.run().await;
    info!(?outcome, "Pipeline finished");
    Ok(())
}
