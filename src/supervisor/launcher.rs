//! Execution units the supervisor can start, poll and kill

use async_trait::async_trait;
use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn execution: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Starts execution units
pub trait Launcher: Send {
    type Handle: ExecutionHandle;

    fn launch(&mut self) -> Result<Self::Handle, LaunchError>;
}

/// A running execution unit
#[async_trait]
pub trait ExecutionHandle: Send {
    /// Non-blocking liveness check
    fn is_finished(&mut self) -> bool;

    /// Terminate unconditionally, with no cleanup inside the unit
    async fn kill(&mut self);
}

/// Runs each execution as a child process killed through the OS on timeout
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-invoke the running executable with `args`
    pub fn current_exe(args: Vec<OsString>) -> Result<Self, LaunchError> {
        Ok(Self::new(std::env::current_exe()?, args))
    }
}

impl Launcher for ProcessLauncher {
    type Handle = ProcessHandle;

    fn launch(&mut self) -> Result<Self::Handle, LaunchError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()?;

        debug!(pid = child.id(), "Spawned execution process");
        Ok(ProcessHandle { child })
    }
}

#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
}

#[async_trait]
impl ExecutionHandle for ProcessHandle {
    fn is_finished(&mut self) -> bool {
        let polled = self.child.try_wait();
        settle(&mut self.child, polled)
    }

    async fn kill(&mut self) {
        // SIGKILL, then wait so the child is reaped
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Couldn't kill execution process");
        }
    }
}

/// Interpret a liveness poll. A child that cannot be polled is killed before
/// it leaves the pool.
fn settle(child: &mut Child, polled: std::io::Result<Option<ExitStatus>>) -> bool {
    match polled {
        Ok(Some(status)) => {
            debug!(%status, "Execution process exited");
            true
        }
        Ok(None) => false,
        Err(e) => {
            warn!(error = %e, "Couldn't poll execution process, killing it");
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "Couldn't kill unpollable execution process");
            }
            true
        }
    }
}

/// Runs each execution as a tokio task on the current runtime.
///
/// Aborting a task only takes effect at its next await point, so this
/// launcher suits tests and embedding rather than untrusted network calls.
pub struct TaskLauncher<F> {
    factory: F,
}

impl<F, Fut> TaskLauncher<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F, Fut> Launcher for TaskLauncher<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Handle = TaskHandle;

    fn launch(&mut self) -> Result<Self::Handle, LaunchError> {
        Ok(TaskHandle {
            handle: tokio::spawn((self.factory)()),
        })
    }
}

#[derive(Debug)]
pub struct TaskHandle {
    handle: JoinHandle<()>,
}

#[async_trait]
impl ExecutionHandle for TaskHandle {
    fn is_finished(&mut self) -> bool {
        self.handle.is_finished()
    }

    async fn kill(&mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}
