//! Logging setup and supervisor counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Metrics handle for recording supervisor counters
#[derive(Debug, Default)]
pub struct Metrics {
    executions_launched: AtomicU64,
    executions_reaped: AtomicU64,
    executions_timed_out: AtomicU64,
    launch_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execution_launched(&self) {
        self.executions_launched.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "executions_launched", "Metric incremented");
    }

    pub fn execution_reaped(&self) {
        self.executions_reaped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "executions_reaped", "Metric incremented");
    }

    pub fn execution_timed_out(&self) {
        self.executions_timed_out.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "executions_timed_out", "Metric incremented");
    }

    pub fn launch_failed(&self) {
        self.launch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "launch_failures", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions_launched: self.executions_launched.load(Ordering::Relaxed),
            executions_reaped: self.executions_reaped.load(Ordering::Relaxed),
            executions_timed_out: self.executions_timed_out.load(Ordering::Relaxed),
            launch_failures: self.launch_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub executions_launched: u64,
    pub executions_reaped: u64,
    pub executions_timed_out: u64,
    pub launch_failures: u64,
}
