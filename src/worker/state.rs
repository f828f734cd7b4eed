use serde::Serialize;

use crate::models::Summary;

/// Phases of one summarization run, published on a watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    #[default]
    Idle,
    Starting,
    AwaitingNotificationSource,
    Summarizing,
    Persisting,
    NotifyingCallback,
    TimedOut,
}

/// Terminal result of one run. Failures here are logged and swallowed; no
/// caller waits on the background pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Summarized(Summary),
    /// The source was connected but had nothing to summarize. Silent no-op.
    NoNotifications,
    /// The notification source never connected within the bounded wait.
    SourceTimedOut,
    /// A newer wake event cancelled this run.
    Superseded,
    Failed(String),
}

/// Outcome of a finished run with a monotonically increasing sequence number,
/// so observers can distinguish consecutive runs on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub seq: u64,
    pub outcome: RunOutcome,
}
