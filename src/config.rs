use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::models::Summary;

/// Callback invoked exactly once after each successful scheduled run.
pub type SummaryCallback = Arc<dyn Fn(Summary) + Send + Sync>;

/// Agent-wide configuration supplied once at `initialize`.
#[derive(Clone)]
pub struct AgentConfig {
    /// Location of the summary store.
    pub db_path: PathBuf,
    pub on_scheduled_summary_ready: SummaryCallback,
    pub worker: WorkerConfig,
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("db_path", &self.db_path)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

/// Tunable waits for the background worker and the runtime-ready gate.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often the run re-checks notification-source connectivity.
    pub source_poll_interval: Duration,
    /// How long a run waits for the notification source before giving up.
    pub source_ready_timeout: Duration,
    /// How often public operations re-check the inference runtime gate.
    pub runtime_poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            source_poll_interval: Duration::from_secs(1),
            source_ready_timeout: Duration::from_secs(120),
            runtime_poll_interval: Duration::from_secs(1),
        }
    }
}
