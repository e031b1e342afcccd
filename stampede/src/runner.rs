use crate::executor::{Decision, Strategy};
use crate::metrics::MetricsHandle;
use crate::pool::WorkerPool;
use stampede_core::{
    IterationContext, IterationError, IterationOutcome, ScenarioSpec, TerminationReason,
    SHUTDOWN_GRACE_PERIOD,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{sleep, sleep_until, timeout, Instant};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Lifecycle of a scenario. Transitions only ever move forward, and `Draining`
/// is never skipped on the normal path: a scenario is not `Done` until every
/// dispatched iteration has reported an outcome (or the abort grace period
/// expired).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Pending,
    Running,
    Draining,
    Done,
}

/// Read-only view of one scenario's progress: lifecycle state plus
/// started/completed counts. Obtain it from
/// [`Orchestrator::progress`](crate::Orchestrator::progress) before the run
/// starts; safe to poll while the run is in progress.
pub struct ScenarioProgress {
    started: AtomicU64,
    completed: AtomicU64,
    state: AtomicU8,
    aborted: AtomicBool,
}

impl ScenarioProgress {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            state: AtomicU8::new(ScenarioState::Pending as u8),
            aborted: AtomicBool::new(false),
        })
    }

    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ScenarioState {
        match self.state.load(Ordering::Relaxed) {
            0 => ScenarioState::Pending,
            1 => ScenarioState::Running,
            2 => ScenarioState::Draining,
            _ => ScenarioState::Done,
        }
    }

    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: ScenarioState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    fn set_aborted(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }
}

/// Binds one scenario spec to its strategy, pool and metrics handle, and runs
/// the dispatch loop to a terminal state.
pub(crate) struct ScenarioRunner {
    spec: ScenarioSpec,
    metrics: MetricsHandle,
    progress: Arc<ScenarioProgress>,
    stop: watch::Receiver<bool>,
}

impl ScenarioRunner {
    pub fn new(
        spec: ScenarioSpec,
        metrics: MetricsHandle,
        progress: Arc<ScenarioProgress>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            spec,
            metrics,
            progress,
            stop,
        }
    }

    #[instrument(name = "scenario", skip_all, fields(name = %self.spec.name))]
    pub async fn run(mut self) -> TerminationReason {
        if !self.spec.start_offset.is_zero() {
            trace!(
                "Waiting {} before start",
                humantime::format_duration(self.spec.start_offset)
            );
            tokio::select! {
                _ = sleep(self.spec.start_offset) => {}
                _ = stopped(&mut self.stop) => {
                    debug!("Aborted before start");
                    self.progress.set_aborted();
                    self.progress.set_state(ScenarioState::Done);
                    return TerminationReason::DeadlineAborted;
                }
            }
        }

        info!("Running with {:?}", self.spec.executor);
        self.progress.set_state(ScenarioState::Running);

        let start = Instant::now();
        let pool = WorkerPool::new(self.spec.vus());
        let mut strategy = Strategy::new(&self.spec.executor, start);
        let mut inflight = JoinSet::new();
        let iteration_fn = self.spec.iteration_fn();
        let scenario: Arc<str> = Arc::from(self.spec.name.as_str());

        // NOTE: This loop is time-sensitive. Nothing in it may block on an
        // iteration; real latency is only ever spent inside spawned tasks.
        let mut aborted = false;
        loop {
            if *self.stop.borrow() {
                aborted = true;
                break;
            }

            match strategy.decide(Instant::now(), &pool) {
                Decision::Dispatch(worker) => {
                    self.progress.started.fetch_add(1, Ordering::Relaxed);
                    let context = IterationContext {
                        scenario: scenario.clone(),
                        vu: worker.vu(),
                    };
                    let iteration = iteration_fn(context);
                    let metrics = self.metrics.clone();
                    let state = self.progress.clone();
                    inflight.spawn(async move {
                        let begin = Instant::now();
                        let result = iteration.await;
                        metrics.record(&IterationOutcome {
                            elapsed: begin.elapsed(),
                            result,
                        });
                        state.completed.fetch_add(1, Ordering::Relaxed);
                        drop(worker);
                    });
                }
                Decision::Dropped => {
                    trace!("No free VU for dispatch tick; dropping iteration");
                    self.metrics.record_dropped();
                }
                Decision::Sleep(at) => {
                    tokio::select! {
                        _ = sleep_until(at) => {}
                        _ = stopped(&mut self.stop) => {}
                    }
                }
                Decision::AwaitSlot => {
                    tokio::select! {
                        _ = pool.released() => {}
                        _ = stopped(&mut self.stop) => {}
                    }
                }
                Decision::Drain => break,
            }

            while let Some(result) = inflight.try_join_next() {
                record_join(&self.metrics, &self.progress, result);
            }
        }

        self.progress.set_state(ScenarioState::Draining);
        if aborted {
            self.progress.set_aborted();
            debug!(
                "Aborted with {} iterations in flight; draining under grace period",
                inflight.len()
            );
            let drained = timeout(SHUTDOWN_GRACE_PERIOD, async {
                while let Some(result) = inflight.join_next().await {
                    record_join(&self.metrics, &self.progress, result);
                }
            })
            .await;
            if drained.is_err() {
                warn!(
                    "Grace period expired with {} iterations still in flight",
                    inflight.len()
                );
                inflight.shutdown().await;
            }
        } else {
            while let Some(result) = inflight.join_next().await {
                record_join(&self.metrics, &self.progress, result);
            }
        }
        self.progress.set_state(ScenarioState::Done);

        let reason = if aborted {
            TerminationReason::DeadlineAborted
        } else {
            TerminationReason::Completed
        };
        info!("Scenario {reason}");
        reason
    }
}

/// A finished iteration task. Success and failure are already recorded by the
/// task itself; all that is left is the panic path.
fn record_join(metrics: &MetricsHandle, progress: &ScenarioProgress, result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(err) if err.is_panic() => {
            warn!("Iteration function panicked");
            metrics.record(&IterationOutcome::failure(
                Duration::ZERO,
                IterationError::new("panic"),
            ));
            progress.completed.fetch_add(1, Ordering::Relaxed);
        }
        // Cancelled during forced shutdown; deliberately unrecorded.
        Err(_) => {}
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    // An error means the orchestrator went away without signalling; nothing
    // will ever stop us, so park forever.
    if stop.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
