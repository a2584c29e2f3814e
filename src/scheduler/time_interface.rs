use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of monotonic time for the protocol loop.
pub trait TimeInterface: Send + Sync {
    fn now_monotonic(&self) -> Instant;
}

/// Runtime clock backed by `tokio::time`.
///
/// Follows tokio's paused clock under `#[tokio::test(start_paused = true)]`,
/// so settling gaps can be exercised without real waiting.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimeSync;

impl TimeInterface for TokioTimeSync {
    fn now_monotonic(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl TimeInterface for ManualClock {
    fn now_monotonic(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: TimeInterface + ?Sized> TimeInterface for std::sync::Arc<T> {
    fn now_monotonic(&self) -> Instant {
        (**self).now_monotonic()
    }
}
