//! Worker pool supervision
//!
//! [`WorkerSupervisor`] keeps at most `capacity` executions alive. On every
//! tick it reaps finished executions, kills those older than the download
//! timeout and launches new ones into free slots. It only tracks liveness
//! and age; how an execution ended is not visible here.

mod launcher;

pub use launcher::{
    ExecutionHandle, LaunchError, Launcher, ProcessHandle, ProcessLauncher, TaskHandle,
    TaskLauncher,
};

use bon::Builder;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::observability::{Metrics, MetricsSnapshot};

/// Pool sizing and pacing
#[derive(Debug, Clone, Builder)]
pub struct SupervisorOptions {
    #[builder(default = 2)]
    pub capacity: usize,
    #[builder(default = Duration::from_secs(5))]
    pub task_interval: Duration,
    #[builder(default = Duration::from_secs(240))]
    pub download_timeout: Duration,
}

impl SupervisorOptions {
    pub fn from_config(worker: &WorkerConfig) -> Self {
        Self::builder()
            .capacity(worker.pool_size)
            .task_interval(worker.task_interval.as_duration())
            .download_timeout(worker.download_timeout.as_duration())
            .build()
    }
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub reaped: usize,
    pub timed_out: usize,
    pub launched: usize,
    pub active: usize,
}

struct Slot<H> {
    id: Uuid,
    started: Instant,
    handle: H,
}

pub struct WorkerSupervisor<L: Launcher> {
    launcher: L,
    options: SupervisorOptions,
    active: Vec<Slot<L::Handle>>,
    metrics: Arc<Metrics>,
}

impl<L: Launcher> WorkerSupervisor<L> {
    pub fn new(launcher: L, options: SupervisorOptions) -> Self {
        Self {
            launcher,
            options,
            active: Vec::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Reap, enforce timeouts, then fill free slots
    pub async fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let now = Instant::now();

        let mut survivors = Vec::with_capacity(self.options.capacity);
        for mut slot in std::mem::take(&mut self.active) {
            if slot.handle.is_finished() {
                debug!(execution_id = %slot.id, "Execution finished");
                self.metrics.execution_reaped();
                report.reaped += 1;
                continue;
            }

            let age = now.saturating_duration_since(slot.started);
            if age > self.options.download_timeout {
                warn!(
                    execution_id = %slot.id,
                    age_secs = age.as_secs(),
                    "Execution exceeded download timeout, killing"
                );
                slot.handle.kill().await;
                self.metrics.execution_timed_out();
                report.timed_out += 1;
                continue;
            }

            survivors.push(slot);
        }
        self.active = survivors;

        while self.active.len() < self.options.capacity {
            match self.launcher.launch() {
                Ok(handle) => {
                    let id = Uuid::now_v7();
                    debug!(execution_id = %id, "Launched execution");
                    self.active.push(Slot {
                        id,
                        started: Instant::now(),
                        handle,
                    });
                    self.metrics.execution_launched();
                    report.launched += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Couldn't launch execution");
                    self.metrics.launch_failed();
                    break;
                }
            }
        }

        report.active = self.active.len();
        report
    }

    /// Tick on a fixed cadence until `shutdown` resolves.
    ///
    /// Live executions are left running on shutdown.
    pub async fn run<S>(mut self, shutdown: S) -> MetricsSnapshot
    where
        S: Future<Output = ()>,
    {
        info!(
            capacity = self.options.capacity,
            interval_ms = self.options.task_interval.as_millis() as u64,
            timeout_secs = self.options.download_timeout.as_secs(),
            "Worker supervisor started"
        );

        let mut ticker = tokio::time::interval(self.options.task_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    debug!(?report, "Supervisor tick");
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            active = self.active.len(),
            launched = snapshot.executions_launched,
            reaped = snapshot.executions_reaped,
            timed_out = snapshot.executions_timed_out,
            "exiting worker..."
        );
        snapshot
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
