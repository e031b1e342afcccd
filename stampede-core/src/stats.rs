use crate::IterationError;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Result of one iteration, produced by the runner's iteration wrapper and
/// consumed by the metrics sink. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    pub elapsed: Duration,
    pub result: Result<(), IterationError>,
}

impl IterationOutcome {
    pub fn success(elapsed: Duration) -> Self {
        Self {
            elapsed,
            result: Ok(()),
        }
    }

    pub fn failure(elapsed: Duration, error: IterationError) -> Self {
        Self {
            elapsed,
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_class(&self) -> Option<&str> {
        self.result.as_ref().err().map(IterationError::class)
    }
}

/// Latency quantiles over recorded iteration outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencySummary {
    pub samples: u64,
    pub mean: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

impl fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p50={} p90={} p99={}",
            humantime::format_duration(self.p50),
            humantime::format_duration(self.p90),
            humantime::format_duration(self.p99),
        )
    }
}

/// Per-scenario counters at the moment of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStats {
    pub name: String,
    pub success: u64,
    pub error: u64,
    /// Dispatch ticks that found no free VU. A capacity-shortfall signal, not
    /// a failure.
    pub dropped: u64,
    pub latency: LatencySummary,
    /// Failure counts keyed by error classification.
    pub error_classes: BTreeMap<String, u64>,
}

impl ScenarioStats {
    pub fn total(&self) -> u64 {
        self.success + self.error
    }

    pub fn error_rate(&self) -> f64 {
        if self.total() == 0 {
            0.
        } else {
            self.error as f64 / self.total() as f64
        }
    }
}

impl fmt::Display for ScenarioStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} iterations ({} ok, {} failed, {} dropped), {}",
            self.name,
            self.total(),
            self.success,
            self.error,
            self.dropped,
            self.latency,
        )
    }
}

/// Process-wide accumulator view, finalized when `run` returns and available
/// earlier via `snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateMetrics {
    pub success: u64,
    pub error: u64,
    pub dropped: u64,
    pub latency: LatencySummary,
    /// Per-scenario breakdown, ordered by scenario name.
    pub scenarios: Vec<ScenarioStats>,
}

impl AggregateMetrics {
    pub fn total(&self) -> u64 {
        self.success + self.error
    }

    pub fn error_rate(&self) -> f64 {
        if self.total() == 0 {
            0.
        } else {
            self.error as f64 / self.total() as f64
        }
    }
}

impl fmt::Display for AggregateMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "total: {} iterations ({} ok, {} failed, {} dropped), {}",
            self.total(),
            self.success,
            self.error,
            self.dropped,
            self.latency,
        )?;
        for scenario in &self.scenarios {
            writeln!(f, "  {scenario}")?;
        }
        Ok(())
    }
}

/// Why a scenario stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The executor's own termination condition was met and all in-flight
    /// iterations completed.
    Completed,
    /// The global deadline (or an explicit stop) cut the scenario short.
    DeadlineAborted,
    /// The scenario's runner itself died. Individual iteration failures never
    /// produce this.
    Failed,
}

impl TerminationReason {
    pub fn is_completed(&self) -> bool {
        matches!(self, TerminationReason::Completed)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::Completed => "completed",
            TerminationReason::DeadlineAborted => "deadline-aborted",
            TerminationReason::Failed => "error",
        };
        write!(f, "{s}")
    }
}

/// Final output of an orchestrator run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub metrics: AggregateMetrics,
    pub terminations: BTreeMap<String, TerminationReason>,
}

impl RunReport {
    /// True when every scenario ran to completion. Intended for exit-code
    /// mapping in the surrounding tooling.
    pub fn success(&self) -> bool {
        self.terminations.values().all(TerminationReason::is_completed)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metrics)?;
        for (name, reason) in &self.terminations {
            writeln!(f, "  {name}: {reason}")?;
        }
        Ok(())
    }
}
