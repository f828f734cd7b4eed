use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};
use tokio::{sync::mpsc, sync::Mutex, task::JoinHandle, time};

use super::{WakeAction, WakeEvent};

/// One-shot wake timer with replace semantics: at most one pending alarm
/// exists per scheduler, and scheduling again cancels the previous one.
#[derive(Clone)]
pub struct AlarmScheduler {
    events: mpsc::Sender<WakeEvent>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AlarmScheduler {
    pub fn new(events: mpsc::Sender<WakeEvent>) -> Self {
        Self {
            events,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Arms the wake timer for an absolute wall-clock time. A time already in
    /// the past fires immediately.
    pub async fn schedule(&self, fire_at_epoch_ms: i64) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let delay = delay_until(fire_at_epoch_ms);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let event = WakeEvent {
                action: WakeAction::Alarm,
                auto_play: false,
            };
            if events.send(event).await.is_err() {
                warn!("wake event dropped: worker loop has shut down");
            }
        });

        *pending = Some(handle);
        info!("summary alarm armed for epoch {fire_at_epoch_ms} ms (fires in {delay:?})");
    }

    /// Drops the pending alarm, if any.
    pub async fn cancel(&self) {
        if let Some(handle) = self.pending.lock().await.take() {
            handle.abort();
            info!("pending summary alarm cancelled");
        }
    }
}

fn delay_until(fire_at_epoch_ms: i64) -> Duration {
    let now_ms = Utc::now().timestamp_millis();
    let delta = fire_at_epoch_ms.saturating_sub(now_ms);
    if delta <= 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(delta as u64)
    }
}
