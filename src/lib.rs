//! notisum — scheduled notification-summarization pipeline.
//!
//! The embedding application injects two collaborators (a live notification
//! source and an on-device inference runtime) and drives everything through
//! [`NotificationAgent`]: initialize once, schedule wake-ups, and read
//! persisted summaries back by id, date, or date range.

mod agent;
mod config;
mod db;
mod envelope;
mod error;
mod models;
mod poll;
mod scheduler;
mod sources;
mod summarizer;
mod utils;
mod worker;

pub use agent::NotificationAgent;
pub use config::{AgentConfig, SummaryCallback, WorkerConfig};
pub use db::Database;
pub use envelope::{codes, AgentError, AgentResult};
pub use error::AgentFault;
pub use models::{NotificationSnapshot, Summary};
pub use poll::{poll_until_ready, wait_until_ready, PollOutcome};
pub use scheduler::{AlarmScheduler, WakeAction, WakeEvent};
pub use sources::{InferenceRuntime, NotificationSource};
pub use summarizer::Summarizer;
pub use worker::{RunOutcome, RunReport, RunState, WorkerController};

/// Initializes logging from `RUST_LOG`, defaulting to info level. Safe to
/// call from embedders that have not set up a logger of their own.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
