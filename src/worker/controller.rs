//! Single-consumer worker loop over the wake-event channel.
//!
//! At most one summarization run is in flight. A new wake event cancels the
//! current run's token and joins its task before spawning the next run, so a
//! superseded run is never interrupted mid-summarization, only between steps.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::{
    sync::{mpsc, watch, Mutex},
    task::{JoinError, JoinHandle},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{SummaryCallback, WorkerConfig},
    db::Database,
    scheduler::WakeEvent,
    sources::NotificationSource,
    summarizer::Summarizer,
};

use super::run::{run_summarization, RunContext};
use super::state::{RunOutcome, RunReport, RunState};

pub struct WorkerController {
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
    state_rx: watch::Receiver<RunState>,
    reports_rx: watch::Receiver<Option<RunReport>>,
}

impl WorkerController {
    pub(crate) fn spawn(
        db: Database,
        source: Arc<dyn NotificationSource>,
        summarizer: Summarizer,
        on_summary_ready: SummaryCallback,
        config: WorkerConfig,
        events: mpsc::Receiver<WakeEvent>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        let (reports_tx, reports_rx) = watch::channel(None);
        let shutdown = CancellationToken::new();

        let ctx = RunContext {
            db,
            source,
            summarizer,
            on_summary_ready,
            config,
            state_tx,
        };
        let handle = tokio::spawn(worker_loop(ctx, events, reports_tx, shutdown.clone()));

        Self {
            shutdown,
            handle: Mutex::new(Some(handle)),
            state_rx,
            reports_rx,
        }
    }

    /// Current run phase, for observers.
    pub fn run_states(&self) -> watch::Receiver<RunState> {
        self.state_rx.clone()
    }

    /// Terminal outcome of each finished run.
    pub fn run_reports(&self) -> watch::Receiver<Option<RunReport>> {
        self.reports_rx.clone()
    }

    /// Cancels any in-flight run and joins the loop.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            handle.await.context("worker loop task failed to join")?;
        }
        Ok(())
    }
}

type InFlight = (JoinHandle<RunOutcome>, CancellationToken);

enum LoopStep {
    RunFinished(Result<RunOutcome, JoinError>),
    Event(Option<WakeEvent>),
    Shutdown,
}

async fn worker_loop(
    ctx: RunContext,
    mut events: mpsc::Receiver<WakeEvent>,
    reports_tx: watch::Sender<Option<RunReport>>,
    shutdown: CancellationToken,
) {
    let mut seq: u64 = 0;
    let mut current: Option<InFlight> = None;

    loop {
        let step = match current.as_mut() {
            Some((handle, _token)) => tokio::select! {
                joined = handle => LoopStep::RunFinished(joined),
                maybe_event = events.recv() => LoopStep::Event(maybe_event),
                _ = shutdown.cancelled() => LoopStep::Shutdown,
            },
            None => tokio::select! {
                maybe_event = events.recv() => LoopStep::Event(maybe_event),
                _ = shutdown.cancelled() => LoopStep::Shutdown,
            },
        };

        match step {
            LoopStep::RunFinished(joined) => {
                current = None;
                publish_report(&reports_tx, &mut seq, joined);
            }
            LoopStep::Event(Some(event)) => {
                supersede_current(&mut current, &reports_tx, &mut seq).await;
                let token = CancellationToken::new();
                let run = tokio::spawn(run_summarization(ctx.clone(), event, token.clone()));
                current = Some((run, token));
            }
            LoopStep::Event(None) | LoopStep::Shutdown => {
                supersede_current(&mut current, &reports_tx, &mut seq).await;
                break;
            }
        }
    }

    info!("summarization worker loop shutting down");
}

async fn supersede_current(
    current: &mut Option<InFlight>,
    reports_tx: &watch::Sender<Option<RunReport>>,
    seq: &mut u64,
) {
    if let Some((handle, token)) = current.take() {
        token.cancel();
        publish_report(reports_tx, seq, handle.await);
    }
}

fn publish_report(
    reports_tx: &watch::Sender<Option<RunReport>>,
    seq: &mut u64,
    joined: Result<RunOutcome, JoinError>,
) {
    *seq += 1;
    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("summarization run task failed to join: {err}");
            RunOutcome::Failed(err.to_string())
        }
    };
    let _ = reports_tx.send(Some(RunReport {
        seq: *seq,
        outcome,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Local;

    use crate::models::NotificationSnapshot;
    use crate::scheduler::WakeAction;
    use crate::sources::InferenceRuntime;

    struct FakeSource {
        connected: AtomicBool,
        snapshots: StdMutex<Vec<NotificationSnapshot>>,
    }

    impl FakeSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(false),
                snapshots: StdMutex::new(Vec::new()),
            })
        }

        fn set_connected(&self, connected: bool) {
            self.connected.store(connected, Ordering::SeqCst);
        }

        fn push(&self, snapshot: NotificationSnapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }
    }

    impl NotificationSource for FakeSource {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn current_snapshots(&self) -> Vec<NotificationSnapshot> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    struct FakeRuntime {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl FakeRuntime {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl InferenceRuntime for FakeRuntime {
        async fn is_ready(&self) -> bool {
            true
        }

        async fn summarize_batch(&self, _notifications_json: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("engine exploded"));
            }
            Ok("you have new messages".to_string())
        }
    }

    fn snapshot(title: &str) -> NotificationSnapshot {
        NotificationSnapshot {
            package_name: "com.example.mail".into(),
            channel: "inbox".into(),
            priority: 0,
            title: title.into(),
            body: "body".into(),
            sub_text: String::new(),
        }
    }

    fn wake() -> WakeEvent {
        WakeEvent {
            action: WakeAction::Alarm,
            auto_play: false,
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        db: Database,
        source: Arc<FakeSource>,
        runtime: Arc<FakeRuntime>,
        events: mpsc::Sender<WakeEvent>,
        worker: WorkerController,
        callbacks: Arc<AtomicUsize>,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("summaries.sqlite3")).unwrap();
        let source = FakeSource::new();
        let runtime = FakeRuntime::new();
        let callbacks = Arc::new(AtomicUsize::new(0));

        let counter = callbacks.clone();
        let on_summary_ready: SummaryCallback = Arc::new(move |_summary| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (events_tx, events_rx) = mpsc::channel(8);
        let worker = WorkerController::spawn(
            db.clone(),
            source.clone(),
            Summarizer::new(runtime.clone()),
            on_summary_ready,
            WorkerConfig::default(),
            events_rx,
        );

        Harness {
            _dir: dir,
            db,
            source,
            runtime,
            events: events_tx,
            worker,
            callbacks,
        }
    }

    async fn wait_report(rx: &mut watch::Receiver<Option<RunReport>>, seq: u64) -> RunReport {
        rx.wait_for(|report| matches!(report, Some(rep) if rep.seq >= seq))
            .await
            .unwrap()
            .clone()
            .unwrap()
    }

    async fn rows_today(db: &Database) -> usize {
        db.get_summaries_by_date(Local::now().date_naive())
            .await
            .unwrap()
            .len()
    }

    #[tokio::test(start_paused = true)]
    async fn source_timeout_writes_nothing_and_skips_callback() {
        let h = harness();
        let mut reports = h.worker.run_reports();

        h.events.send(wake()).await.unwrap();
        let report = wait_report(&mut reports, 1).await;

        assert_eq!(report.outcome, RunOutcome::SourceTimedOut);
        assert_eq!(rows_today(&h.db).await, 0);
        assert_eq!(h.callbacks.load(Ordering::SeqCst), 0);
        assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_notifications_is_a_silent_noop() {
        let h = harness();
        h.source.set_connected(true);
        let mut reports = h.worker.run_reports();

        h.events.send(wake()).await.unwrap();
        let report = wait_report(&mut reports, 1).await;

        assert_eq!(report.outcome, RunOutcome::NoNotifications);
        assert_eq!(rows_today(&h.db).await, 0);
        assert_eq!(h.callbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_run_persists_and_notifies_once() {
        let h = harness();
        h.source.set_connected(true);
        h.source.push(snapshot("Your order shipped"));
        let mut reports = h.worker.run_reports();

        h.events.send(wake()).await.unwrap();
        let report = wait_report(&mut reports, 1).await;

        let RunOutcome::Summarized(summary) = report.outcome else {
            panic!("expected a summarized outcome, got {:?}", report.outcome);
        };
        assert_eq!(summary.body, "you have new messages");
        assert_eq!(
            h.db.get_summary_by_id(&summary.id).await.unwrap(),
            Some(summary)
        );
        assert_eq!(h.callbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_summarization_is_swallowed() {
        let h = harness();
        h.source.set_connected(true);
        h.source.push(snapshot("Your order shipped"));
        h.runtime.fail.store(true, Ordering::SeqCst);
        let mut reports = h.worker.run_reports();

        h.events.send(wake()).await.unwrap();
        let report = wait_report(&mut reports, 1).await;

        assert!(matches!(report.outcome, RunOutcome::Failed(_)));
        assert_eq!(rows_today(&h.db).await, 0);
        assert_eq!(h.callbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_wake_supersedes_a_run_polling_for_the_source() {
        let h = harness();
        h.source.push(snapshot("Meeting at 3pm"));
        let mut reports = h.worker.run_reports();
        let mut states = h.worker.run_states();

        h.events.send(wake()).await.unwrap();
        states
            .wait_for(|state| *state == RunState::AwaitingNotificationSource)
            .await
            .unwrap();

        // Second wake arrives while the first run is still polling.
        h.events.send(wake()).await.unwrap();
        h.source.set_connected(true);

        let report = wait_report(&mut reports, 2).await;
        assert!(matches!(report.outcome, RunOutcome::Summarized(_)));

        // Only the newer run summarized and persisted.
        assert_eq!(h.runtime.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rows_today(&h.db).await, 1);
        assert_eq!(h.callbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_an_in_flight_run() {
        let h = harness();
        let mut states = h.worker.run_states();

        h.events.send(wake()).await.unwrap();
        states
            .wait_for(|state| *state == RunState::AwaitingNotificationSource)
            .await
            .unwrap();

        h.worker.shutdown().await.unwrap();

        let report = h.worker.run_reports().borrow().clone().unwrap();
        assert_eq!(report.outcome, RunOutcome::Superseded);
        assert_eq!(rows_today(&h.db).await, 0);
    }
}
