//! Converts a notification batch into one `Summary` via the inference runtime.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use uuid::Uuid;

use crate::models::{NotificationSnapshot, Summary};
use crate::sources::InferenceRuntime;

#[derive(Clone)]
pub struct Summarizer {
    runtime: Arc<dyn InferenceRuntime>,
}

impl Summarizer {
    pub fn new(runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self { runtime }
    }

    /// Produces a fresh summary record dated with the local calendar date,
    /// matching how consumers later query by day.
    pub async fn summarize(&self, notifications: &[NotificationSnapshot]) -> Result<Summary> {
        let batch = serde_json::to_string(notifications)
            .context("failed to encode notification batch")?;

        let body = self
            .runtime
            .summarize_batch(&batch)
            .await
            .context("inference runtime rejected the summarization request")?;

        Ok(Summary {
            id: Uuid::new_v4().to_string(),
            date: Local::now().date_naive(),
            body,
        })
    }
}
