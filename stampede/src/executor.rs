mod arrival_rate;
mod per_vu_iterations;
mod shared_iterations;

pub(crate) use arrival_rate::ArrivalRate;
pub(crate) use per_vu_iterations::PerVuIterations;
pub(crate) use shared_iterations::SharedIterations;

use crate::pool::{Worker, WorkerPool};
use stampede_core::ExecutorKind;
use std::sync::Arc;
use tokio::time::Instant;

/// What the dispatch loop should do next.
pub(crate) enum Decision {
    /// Run one iteration now on the acquired worker.
    Dispatch(Worker),
    /// A due dispatch tick found no free worker; the opportunity is skipped
    /// and counted, never queued.
    Dropped,
    /// Nothing due before the given instant.
    Sleep(Instant),
    /// Work remains but every eligible worker is busy; wait for a release.
    AwaitSlot,
    /// Schedule exhausted; stop dispatching and drain.
    Drain,
}

/// Scheduling policy: given the current time and pool state, decides whether
/// to dispatch an iteration and when the scenario's schedule is exhausted.
///
/// A closed set so that new policies are forced through configuration
/// validation rather than stringly-typed dispatch.
pub(crate) enum Strategy {
    ArrivalRate(ArrivalRate),
    Shared(SharedIterations),
    PerVu(PerVuIterations),
}

impl Strategy {
    pub fn new(kind: &ExecutorKind, start: Instant) -> Self {
        match kind {
            ExecutorKind::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                ..
            } => Strategy::ArrivalRate(ArrivalRate::new(*rate, *time_unit, *duration, start)),
            ExecutorKind::SharedIterations { iterations, .. } => {
                Strategy::Shared(SharedIterations::new(*iterations))
            }
            ExecutorKind::PerVuIterations {
                vus,
                iterations_per_vu,
            } => Strategy::PerVu(PerVuIterations::new(*vus, *iterations_per_vu)),
        }
    }

    pub fn decide(&mut self, now: Instant, pool: &Arc<WorkerPool>) -> Decision {
        match self {
            Strategy::ArrivalRate(strategy) => strategy.decide(now, pool),
            Strategy::Shared(strategy) => strategy.decide(pool),
            Strategy::PerVu(strategy) => strategy.decide(pool),
        }
    }
}
