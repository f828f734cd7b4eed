use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{SummaryCallback, WorkerConfig},
    db::Database,
    poll::{poll_until_ready, PollOutcome},
    scheduler::WakeEvent,
    sources::NotificationSource,
    summarizer::Summarizer,
};

use super::state::{RunOutcome, RunState};

// Set to false to silence per-run logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Everything a run needs, resolved fresh for each wake event.
#[derive(Clone)]
pub(crate) struct RunContext {
    pub db: Database,
    pub source: Arc<dyn NotificationSource>,
    pub summarizer: Summarizer,
    pub on_summary_ready: SummaryCallback,
    pub config: WorkerConfig,
    pub state_tx: watch::Sender<RunState>,
}

impl RunContext {
    fn set_state(&self, state: RunState) {
        let _ = self.state_tx.send(state);
    }
}

/// One summarization run. Cancellation is cooperative: the token is checked
/// between steps and raced against the readiness poll, but an in-flight
/// summarizer call is never interrupted.
pub(crate) async fn run_summarization(
    ctx: RunContext,
    event: WakeEvent,
    cancel: CancellationToken,
) -> RunOutcome {
    ctx.set_state(RunState::Starting);
    log_info!(
        "summarization run started (action={:?}, auto_play={})",
        event.action,
        event.auto_play
    );

    ctx.set_state(RunState::AwaitingNotificationSource);
    let source = ctx.source.clone();
    let readiness = tokio::select! {
        outcome = poll_until_ready(
            move || {
                let source = source.clone();
                async move { source.is_connected() }
            },
            ctx.config.source_poll_interval,
            ctx.config.source_ready_timeout,
        ) => outcome,
        _ = cancel.cancelled() => {
            log_info!("run superseded while awaiting notification source");
            ctx.set_state(RunState::Idle);
            return RunOutcome::Superseded;
        }
    };

    if readiness == PollOutcome::TimedOut {
        log_error!(
            "notification source not connected within {:?}; abandoning run",
            ctx.config.source_ready_timeout
        );
        ctx.set_state(RunState::TimedOut);
        ctx.set_state(RunState::Idle);
        return RunOutcome::SourceTimedOut;
    }

    let notifications = ctx.source.current_snapshots();
    if notifications.is_empty() {
        log_info!("no notifications to summarize; skipping run");
        ctx.set_state(RunState::Idle);
        return RunOutcome::NoNotifications;
    }

    ctx.set_state(RunState::Summarizing);
    let summary = match ctx.summarizer.summarize(&notifications).await {
        Ok(summary) => summary,
        Err(err) => {
            log_error!("summarization failed: {err:#}");
            ctx.set_state(RunState::Idle);
            return RunOutcome::Failed(format!("{err:#}"));
        }
    };

    if cancel.is_cancelled() {
        log_info!("run superseded after summarization; discarding result");
        ctx.set_state(RunState::Idle);
        return RunOutcome::Superseded;
    }

    ctx.set_state(RunState::Persisting);
    if let Err(err) = ctx.db.insert_summary(&summary).await {
        log_error!("failed to persist summary {}: {err:#}", summary.id);
        ctx.set_state(RunState::Idle);
        return RunOutcome::Failed(format!("{err:#}"));
    }

    ctx.set_state(RunState::NotifyingCallback);
    (ctx.on_summary_ready)(summary.clone());

    log_info!("summarization run completed (summary {})", summary.id);
    ctx.set_state(RunState::Idle);
    RunOutcome::Summarized(summary)
}
