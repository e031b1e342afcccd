#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod metrics;
pub mod orchestrator;

pub(crate) mod clock;
pub(crate) mod executor;
pub(crate) mod pool;
pub(crate) mod runner;

pub use self::metrics::MetricsSink;
pub use orchestrator::{Orchestrator, StopHandle};
pub use runner::{ScenarioProgress, ScenarioState};

pub use stampede_core::{
    AggregateMetrics, ConfigurationError, ExecutorKind, IterationContext, IterationError,
    IterationFn, IterationFuture, IterationOutcome, LatencySummary, RunReport, ScenarioSpec,
    ScenarioStats, TerminationReason, DEFAULT_TIME_UNIT, SHUTDOWN_GRACE_PERIOD,
};

pub mod prelude {
    pub use crate::orchestrator::{Orchestrator, StopHandle};
    pub use crate::runner::{ScenarioProgress, ScenarioState};
    pub use stampede_core::{
        AggregateMetrics, ConfigurationError, ExecutorKind, IterationContext, IterationError,
        IterationFuture, RunReport, ScenarioSpec, TerminationReason,
    };
}
