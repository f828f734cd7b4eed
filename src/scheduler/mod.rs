pub mod alarm;

pub use alarm::AlarmScheduler;

/// What triggered a wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeAction {
    Alarm,
    Boot,
}

/// Inbound wake event feeding the worker's single-consumer loop. The
/// auto-play flag is opaque to the pipeline; playback belongs to the
/// embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeEvent {
    pub action: WakeAction,
    pub auto_play: bool,
}
