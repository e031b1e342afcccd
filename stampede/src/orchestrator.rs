use crate::metrics::{MetricsHandle, MetricsSink};
use crate::runner::{ScenarioProgress, ScenarioRunner};
use stampede_core::{
    AggregateMetrics, ConfigurationError, RunReport, ScenarioSpec, TerminationReason,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Cancels a run in progress. Scenarios stop dispatching immediately and
/// drain their in-flight iterations under the shutdown grace period.
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }
}

/// Top-level coordination: validates the scenario set, starts one runner per
/// scenario, enforces the global deadline, and assembles the final report.
pub struct Orchestrator {
    specs: Vec<ScenarioSpec>,
    handles: Vec<MetricsHandle>,
    progress: Vec<Arc<ScenarioProgress>>,
    sink: Arc<MetricsSink>,
    stop: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Orchestrator {
    /// Validates every spec (unique names, well-formed timing fields) and
    /// builds the metrics sink. All configuration failures happen here,
    /// before any scenario starts.
    pub fn configure(specs: Vec<ScenarioSpec>) -> Result<Self, ConfigurationError> {
        let mut names = HashSet::new();
        for spec in &specs {
            spec.validate()?;
            if !names.insert(spec.name.clone()) {
                return Err(ConfigurationError::DuplicateName(spec.name.clone()));
            }
        }

        let mut sink = MetricsSink::new();
        let handles = specs.iter().map(|spec| sink.register(&spec.name)).collect();
        let progress = specs.iter().map(|_| ScenarioProgress::new()).collect();
        let (stop, stop_rx) = watch::channel(false);

        Ok(Self {
            specs,
            handles,
            progress,
            sink: Arc::new(sink),
            stop: Arc::new(stop),
            stop_rx,
        })
    }

    /// The metrics sink shared with all runners. Clone it out before `run` to
    /// take snapshots while the run is in progress.
    pub fn metrics(&self) -> Arc<MetricsSink> {
        self.sink.clone()
    }

    /// Read-only copy of the aggregate counters at this moment.
    pub fn snapshot(&self) -> AggregateMetrics {
        self.sink.snapshot()
    }

    /// Live per-scenario progress (lifecycle state, started/completed counts),
    /// keyed by scenario name. Clone it out before `run` to poll individual
    /// scenarios while the run is in progress.
    pub fn progress(&self) -> BTreeMap<String, Arc<ScenarioProgress>> {
        self.specs
            .iter()
            .map(|spec| spec.name.clone())
            .zip(self.progress.iter().cloned())
            .collect()
    }

    /// Handle for cancelling the run from elsewhere. An explicit stop is
    /// indistinguishable from a deadline of "now" and surfaces the same way.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: self.stop.clone(),
        }
    }

    /// Runs every configured scenario to a terminal state, each delayed by
    /// its own start offset, and returns the finalized metrics plus one
    /// termination reason per scenario.
    ///
    /// When `deadline` elapses first, all non-terminal scenarios are
    /// cancelled and drained under the grace period before this returns.
    pub async fn run(self, deadline: Option<Duration>) -> RunReport {
        let Self {
            specs,
            handles,
            progress,
            sink,
            stop,
            stop_rx,
        } = self;

        info!("Starting {} scenarios", specs.len());
        let mut tasks: Vec<(String, JoinHandle<TerminationReason>)> =
            Vec::with_capacity(specs.len());
        for ((spec, metrics), progress) in specs.into_iter().zip(handles).zip(progress) {
            let name = spec.name.clone();
            let runner = ScenarioRunner::new(spec, metrics, progress, stop_rx.clone());
            tasks.push((name, tokio::spawn(runner.run())));
        }
        drop(stop_rx);

        let deadline_task = deadline.map(|deadline| {
            let stop = stop.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                warn!(
                    "Global deadline of {} reached; cancelling active scenarios",
                    humantime::format_duration(deadline)
                );
                stop.send_replace(true);
            })
        });

        let mut terminations = BTreeMap::new();
        for (name, task) in tasks {
            let reason = match task.await {
                Ok(reason) => reason,
                Err(err) => {
                    error!("Runner for {name} died: {err}");
                    TerminationReason::Failed
                }
            };
            terminations.insert(name, reason);
        }

        if let Some(task) = deadline_task {
            task.abort();
        }

        let report = RunReport {
            metrics: sink.snapshot(),
            terminations,
        };
        info!("Run complete: {} iterations", report.metrics.total());
        report
    }
}
