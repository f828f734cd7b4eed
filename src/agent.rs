//! Public agent façade.
//!
//! Owns the dependency graph (store, scheduler, worker) and is the only place
//! that creates it. Every operation returns the uniform result envelope;
//! every operation except `initialize` first requires initialization and then
//! blocks on the inference runtime's readiness gate.

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use chrono::NaiveDate;
use log::info;
use tokio::sync::{mpsc, Mutex};

use crate::{
    config::AgentConfig,
    db::Database,
    envelope::AgentResult,
    error::AgentFault,
    models::Summary,
    poll::wait_until_ready,
    scheduler::{AlarmScheduler, WakeAction, WakeEvent},
    sources::{InferenceRuntime, NotificationSource},
    summarizer::Summarizer,
    worker::WorkerController,
};

struct AgentInner {
    db: Database,
    scheduler: AlarmScheduler,
    worker: WorkerController,
    summarizer: Summarizer,
    events: mpsc::Sender<WakeEvent>,
    config: AgentConfig,
}

pub struct NotificationAgent {
    source: Arc<dyn NotificationSource>,
    runtime: Arc<dyn InferenceRuntime>,
    inner: OnceLock<AgentInner>,
    init_lock: Mutex<()>,
}

impl NotificationAgent {
    /// Collaborators are injected once at construction; the rest of the graph
    /// is built by `initialize`.
    pub fn new(
        source: Arc<dyn NotificationSource>,
        runtime: Arc<dyn InferenceRuntime>,
    ) -> Self {
        Self {
            source,
            runtime,
            inner: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Builds the dependency graph exactly once. A second call is a no-op.
    pub async fn initialize(&self, config: AgentConfig) -> AgentResult<()> {
        let _guard = self.init_lock.lock().await;
        if self.inner.get().is_some() {
            return AgentResult::ok(());
        }

        match self.build_graph(config) {
            Ok(inner) => {
                // Cannot race: the init lock is held.
                let _ = self.inner.set(inner);
                info!("notification agent initialized");
                AgentResult::ok(())
            }
            Err(err) => AgentResult::failure(err),
        }
    }

    fn build_graph(&self, config: AgentConfig) -> Result<AgentInner> {
        let db = Database::new(config.db_path.clone())?;
        let summarizer = Summarizer::new(self.runtime.clone());

        let (events_tx, events_rx) = mpsc::channel(8);
        let scheduler = AlarmScheduler::new(events_tx.clone());
        let worker = WorkerController::spawn(
            db.clone(),
            self.source.clone(),
            summarizer.clone(),
            config.on_scheduled_summary_ready.clone(),
            config.worker.clone(),
            events_rx,
        );

        Ok(AgentInner {
            db,
            scheduler,
            worker,
            summarizer,
            events: events_tx,
            config,
        })
    }

    /// Requires initialization, then waits (unbounded, 1s poll) for the
    /// inference runtime to signal readiness.
    async fn ready_inner(&self) -> Result<&AgentInner> {
        let inner = self.inner.get().ok_or(AgentFault::NotInitialized)?;

        let runtime = self.runtime.clone();
        wait_until_ready(
            move || {
                let runtime = runtime.clone();
                async move {
                    let ready = runtime.is_ready().await;
                    if !ready {
                        info!("inference runtime not ready yet; retrying");
                    }
                    ready
                }
            },
            inner.config.worker.runtime_poll_interval,
        )
        .await;

        Ok(inner)
    }

    /// Arms the one-shot summary alarm, replacing any pending one.
    pub async fn schedule(&self, time_millis: i64) -> AgentResult<()> {
        match self.ready_inner().await {
            Ok(inner) => {
                inner.scheduler.schedule(time_millis).await;
                AgentResult::ok(())
            }
            Err(err) => AgentResult::failure(err),
        }
    }

    /// Immediate summarization of whatever is currently visible, independent
    /// of the scheduled pipeline: nothing is persisted and no callback fires.
    /// An in-flight scheduled run is left untouched.
    pub async fn summarize_current_notifications(&self) -> AgentResult<Summary> {
        let inner = match self.ready_inner().await {
            Ok(inner) => inner,
            Err(err) => return AgentResult::failure(err),
        };

        let notifications = self.source.current_snapshots();
        if notifications.is_empty() {
            return AgentResult::failure(AgentFault::NoNotifications.into());
        }

        AgentResult::from_result(inner.summarizer.summarize(&notifications).await)
    }

    pub async fn get_summary_by_id(&self, id: &str) -> AgentResult<Option<Summary>> {
        match self.ready_inner().await {
            Ok(inner) => AgentResult::from_result(inner.db.get_summary_by_id(id).await),
            Err(err) => AgentResult::failure(err),
        }
    }

    pub async fn get_summaries_by_date(&self, date: NaiveDate) -> AgentResult<Vec<Summary>> {
        match self.ready_inner().await {
            Ok(inner) => AgentResult::from_result(inner.db.get_summaries_by_date(date).await),
            Err(err) => AgentResult::failure(err),
        }
    }

    pub async fn get_summaries_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AgentResult<Vec<Summary>> {
        match self.ready_inner().await {
            Ok(inner) => AgentResult::from_result(
                inner.db.get_summaries_by_date_range(start, end).await,
            ),
            Err(err) => AgentResult::failure(err),
        }
    }

    /// Inbound device-boot trigger. Re-runs the pipeline without waiting on
    /// the runtime gate; the run itself polls the notification source anyway.
    pub async fn notify_boot(&self) -> AgentResult<()> {
        let Some(inner) = self.inner.get() else {
            return AgentResult::failure(AgentFault::NotInitialized.into());
        };

        let event = WakeEvent {
            action: WakeAction::Boot,
            auto_play: false,
        };
        match inner.events.send(event).await {
            Ok(()) => AgentResult::ok(()),
            Err(err) => AgentResult::failure(anyhow::anyhow!(
                "failed to deliver boot wake event: {err}"
            )),
        }
    }

    /// Tears down the pending alarm and the worker loop.
    pub async fn shutdown(&self) -> AgentResult<()> {
        let Some(inner) = self.inner.get() else {
            return AgentResult::failure(AgentFault::NotInitialized.into());
        };

        inner.scheduler.cancel().await;
        AgentResult::from_result(inner.worker.shutdown().await)
    }
}
