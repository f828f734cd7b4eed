//! Collaborator seams supplied by the embedding application.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::NotificationSnapshot;

/// Live view of currently displayed system notifications.
///
/// The platform listener connects asynchronously after process start; runs
/// poll `is_connected` before reading snapshots.
pub trait NotificationSource: Send + Sync {
    fn is_connected(&self) -> bool;
    fn current_snapshots(&self) -> Vec<NotificationSnapshot>;
}

/// Opaque on-device inference engine.
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    /// Readiness gate; public agent operations poll this until it holds.
    async fn is_ready(&self) -> bool;

    /// Run the summarization method over a JSON-encoded batch of
    /// notification snapshots, returning the plain-text summary body.
    async fn summarize_batch(&self, notifications_json: &str) -> Result<String>;
}
