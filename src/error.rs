use thiserror::Error;

/// Typed faults that cross the agent façade. Everything else is wrapped as an
/// unclassified failure with its message preserved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentFault {
    #[error("agent is not initialized; call initialize first")]
    NotInitialized,
    #[error("no notifications found")]
    NoNotifications,
    #[error("summary {0} already exists")]
    DuplicateSummary(String),
}
