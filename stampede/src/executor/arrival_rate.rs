use super::Decision;
use crate::clock::{Tick, Timer};
use crate::pool::WorkerPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Constant-arrival-rate policy: `rate` dispatches per `time_unit` for
/// `duration`, regardless of how long each iteration takes.
///
/// A due tick with no free worker is reported as [`Decision::Dropped`] so the
/// dispatch cadence is preserved under saturation instead of building a queue.
pub(crate) struct ArrivalRate {
    timer: Timer,
    deadline: Instant,
}

impl ArrivalRate {
    pub fn new(rate: u32, time_unit: Duration, duration: Duration, start: Instant) -> Self {
        // Validation guarantees rate > 0 and a nonzero period.
        let period = time_unit / rate;
        Self {
            timer: Timer::new(start, period),
            deadline: start + duration,
        }
    }

    pub fn decide(&mut self, now: Instant, pool: &Arc<WorkerPool>) -> Decision {
        if now >= self.deadline {
            return Decision::Drain;
        }
        match self.timer.poll(now) {
            Tick::Pending(at) => Decision::Sleep(at.min(self.deadline)),
            Tick::Due => match pool.try_acquire() {
                Some(worker) => Decision::Dispatch(worker),
                None => Decision::Dropped,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(strategy: &mut ArrivalRate, pool: &Arc<WorkerPool>, until: Duration, start: Instant) -> (u64, u64) {
        let mut dispatched = 0;
        let mut dropped = 0;
        let mut now = start;
        loop {
            match strategy.decide(now, pool) {
                Decision::Dispatch(worker) => {
                    dispatched += 1;
                    drop(worker);
                }
                Decision::Dropped => dropped += 1,
                Decision::Sleep(at) => now = at,
                Decision::AwaitSlot => unreachable!("rate strategy never waits on the pool"),
                Decision::Drain => break,
            }
            if now > start + until {
                break;
            }
        }
        (dispatched, dropped)
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_count_tracks_rate_times_duration() {
        let start = Instant::now();
        let mut strategy = ArrivalRate::new(
            50,
            Duration::from_secs(1),
            Duration::from_secs(30),
            start,
        );
        let pool = WorkerPool::new(10);

        let (dispatched, dropped) = drive(&mut strategy, &pool, Duration::from_secs(31), start);
        assert_eq!(dispatched, 1500);
        assert_eq!(dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_ticks_drop() {
        let start = Instant::now();
        let mut strategy =
            ArrivalRate::new(10, Duration::from_secs(1), Duration::from_secs(1), start);
        let pool = WorkerPool::new(1);
        // Keep the only worker busy for the whole window.
        let _held = pool.try_acquire().unwrap();

        let (dispatched, dropped) = drive(&mut strategy, &pool, Duration::from_secs(2), start);
        assert_eq!(dispatched, 0);
        assert_eq!(dropped, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn drains_exactly_at_deadline() {
        let start = Instant::now();
        let mut strategy =
            ArrivalRate::new(4, Duration::from_secs(1), Duration::from_secs(1), start);
        let pool = WorkerPool::new(1);

        assert!(matches!(
            strategy.decide(start + Duration::from_secs(1), &pool),
            Decision::Drain
        ));
    }
}
