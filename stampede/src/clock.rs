use std::time::Duration;
use tokio::time::Instant;

/// Outcome of polling a [`Timer`].
pub(crate) enum Tick {
    /// A dispatch opportunity is due now.
    Due,
    /// Nothing due before the given instant.
    Pending(Instant),
}

/// Fixed-cadence schedule on the monotonic clock.
///
/// Purely synchronous: callers pass in `now` and sleep themselves when told
/// to, so pacing is never entangled with iteration latency and tests can walk
/// the schedule with arbitrary instants. Under a paused tokio runtime the time
/// driver doubles as the fake clock.
pub(crate) struct Timer {
    next: Instant,
    period: Duration,
}

impl Timer {
    /// First tick is due at `start` itself.
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            next: start,
            period,
        }
    }

    /// One `Due` per call while behind schedule, so a delayed caller bursts to
    /// catch up rather than shifting the whole schedule.
    pub fn poll(&mut self, now: Instant) -> Tick {
        if now >= self.next {
            self.next += self.period;
            Tick::Due
        } else {
            Tick::Pending(self.next)
        }
    }
}
