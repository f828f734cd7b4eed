//! Cooperative poll-with-delay primitives.
//!
//! Both helpers check the predicate immediately, then sleep between retries
//! on the tokio clock, so tests can drive them with a paused runtime instead
//! of real timers. Callers that need cancellation race these futures against
//! a `CancellationToken` in a `select!`.

use std::future::Future;
use std::time::Duration;

use tokio::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    TimedOut,
}

/// Polls `predicate` every `interval` until it holds or `timeout` elapses.
pub async fn poll_until_ready<F, Fut>(
    mut predicate: F,
    interval: Duration,
    timeout: Duration,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = time::Instant::now() + timeout;
    loop {
        if predicate().await {
            return PollOutcome::Ready;
        }
        if time::Instant::now() >= deadline {
            return PollOutcome::TimedOut;
        }
        time::sleep(interval).await;
    }
}

/// Unbounded variant used for the inference-runtime readiness gate.
pub async fn wait_until_ready<F, Fut>(mut predicate: F, interval: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        if predicate().await {
            return;
        }
        time::sleep(interval).await;
    }
}
