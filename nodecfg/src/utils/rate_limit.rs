use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

/// Allows at most `max` events per `period`.
///
/// The window restarts when the first event after expiry arrives, which is
/// good enough for throttling log output.
#[derive(Debug)]
pub(crate) struct RateLimit {
    period: Duration,
    max: u32,
    window: Mutex<Window>,
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: u32,
}

impl RateLimit {
    pub(crate) fn new(period: Duration, max: u32) -> Self {
        RateLimit {
            period,
            max,
            window: Mutex::new(Window { started_at: Instant::now(), count: 0 }),
        }
    }

    /// Record one event; `true` if it is within the budget.
    pub(crate) fn check(&self) -> bool {
        let mut w = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if now.duration_since(w.started_at) >= self.period {
            w.started_at = now;
            w.count = 0;
        }
        w.count += 1;
        w.count <= self.max
    }
}
