use crate::{ConfigurationError, IterationError, DEFAULT_TIME_UNIT};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Context handed to every invocation of an iteration function.
#[derive(Debug, Clone)]
pub struct IterationContext {
    /// Name of the scenario this iteration belongs to.
    pub scenario: Arc<str>,
    /// Index of the virtual user executing the iteration (`0..vus`).
    pub vu: usize,
}

pub type IterationFuture = Pin<Box<dyn Future<Output = Result<(), IterationError>> + Send>>;

/// The user-supplied workload. Expected to perform one unit of
/// externally-visible work (e.g. one HTTP request) and report the result; it
/// must not manage concurrency itself.
pub type IterationFn = Arc<dyn Fn(IterationContext) -> IterationFuture + Send + Sync>;

/// Scheduling policy for a scenario.
///
/// A closed set: each variant carries exactly the fields that are meaningful
/// for it, so a spec cannot mix contradictory termination conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Dispatch `rate` iterations per `time_unit` for `duration`, independent
    /// of how long each iteration takes. A dispatch tick that finds no free VU
    /// is dropped and counted, never queued.
    ConstantArrivalRate {
        rate: u32,
        time_unit: Duration,
        duration: Duration,
        pre_allocated_vus: usize,
    },
    /// A fixed total amount of work pulled from a shared counter by whichever
    /// VU is free. No timing target; throughput is whatever the pool sustains.
    SharedIterations { vus: usize, iterations: u64 },
    /// Each VU independently runs its own fixed count.
    PerVuIterations { vus: usize, iterations_per_vu: u64 },
}

impl ExecutorKind {
    /// Size of the worker pool this executor runs on.
    pub fn vus(&self) -> usize {
        match self {
            ExecutorKind::ConstantArrivalRate {
                pre_allocated_vus, ..
            } => *pre_allocated_vus,
            ExecutorKind::SharedIterations { vus, .. } => *vus,
            ExecutorKind::PerVuIterations { vus, .. } => *vus,
        }
    }
}

/// Immutable descriptor of one workload: a name, a scheduling policy, a start
/// offset relative to orchestrator start, and the iteration function.
#[derive(Clone)]
pub struct ScenarioSpec {
    pub name: String,
    pub executor: ExecutorKind,
    pub start_offset: Duration,
    iteration_fn: IterationFn,
}

impl fmt::Debug for ScenarioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioSpec")
            .field("name", &self.name)
            .field("executor", &self.executor)
            .field("start_offset", &self.start_offset)
            .finish_non_exhaustive()
    }
}

impl ScenarioSpec {
    pub fn new<F, Fut>(name: impl Into<String>, executor: ExecutorKind, iteration_fn: F) -> Self
    where
        F: Fn(IterationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), IterationError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            executor,
            start_offset: Duration::ZERO,
            iteration_fn: Arc::new(move |ctx| Box::pin(iteration_fn(ctx))),
        }
    }

    /// Constant-arrival-rate scenario with `rate` iterations per second. Use
    /// [`ScenarioSpec::new`] with an explicit [`ExecutorKind`] for a different
    /// time unit.
    pub fn constant_arrival_rate<F, Fut>(
        name: impl Into<String>,
        rate: u32,
        duration: Duration,
        pre_allocated_vus: usize,
        iteration_fn: F,
    ) -> Self
    where
        F: Fn(IterationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), IterationError>> + Send + 'static,
    {
        Self::new(
            name,
            ExecutorKind::ConstantArrivalRate {
                rate,
                time_unit: DEFAULT_TIME_UNIT,
                duration,
                pre_allocated_vus,
            },
            iteration_fn,
        )
    }

    pub fn shared_iterations<F, Fut>(
        name: impl Into<String>,
        vus: usize,
        iterations: u64,
        iteration_fn: F,
    ) -> Self
    where
        F: Fn(IterationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), IterationError>> + Send + 'static,
    {
        Self::new(
            name,
            ExecutorKind::SharedIterations { vus, iterations },
            iteration_fn,
        )
    }

    pub fn per_vu_iterations<F, Fut>(
        name: impl Into<String>,
        vus: usize,
        iterations_per_vu: u64,
        iteration_fn: F,
    ) -> Self
    where
        F: Fn(IterationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), IterationError>> + Send + 'static,
    {
        Self::new(
            name,
            ExecutorKind::PerVuIterations {
                vus,
                iterations_per_vu,
            },
            iteration_fn,
        )
    }

    /// Delay this scenario's start relative to orchestrator start.
    pub fn start_after(mut self, offset: Duration) -> Self {
        self.start_offset = offset;
        self
    }

    pub fn vus(&self) -> usize {
        self.executor.vus()
    }

    #[doc(hidden)]
    pub fn iteration_fn(&self) -> IterationFn {
        self.iteration_fn.clone()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let name = || self.name.clone();
        match &self.executor {
            ExecutorKind::ConstantArrivalRate {
                rate,
                time_unit,
                duration,
                pre_allocated_vus,
            } => {
                if *rate == 0 {
                    return Err(ConfigurationError::ZeroRate(name()));
                }
                if time_unit.is_zero() {
                    return Err(ConfigurationError::ZeroTimeUnit(name()));
                }
                if (*time_unit / *rate).is_zero() {
                    return Err(ConfigurationError::RateTooHigh(name()));
                }
                if duration.is_zero() {
                    return Err(ConfigurationError::ZeroDuration(name()));
                }
                if *pre_allocated_vus == 0 {
                    return Err(ConfigurationError::ZeroVus(name()));
                }
            }
            ExecutorKind::SharedIterations { vus, iterations } => {
                if *vus == 0 {
                    return Err(ConfigurationError::ZeroVus(name()));
                }
                if *iterations == 0 {
                    return Err(ConfigurationError::ZeroIterations(name()));
                }
            }
            ExecutorKind::PerVuIterations {
                vus,
                iterations_per_vu,
            } => {
                if *vus == 0 {
                    return Err(ConfigurationError::ZeroVus(name()));
                }
                if *iterations_per_vu == 0 {
                    return Err(ConfigurationError::ZeroIterations(name()));
                }
            }
        }
        Ok(())
    }
}
