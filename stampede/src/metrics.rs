use metrics_util::AtomicBucket;
use pdatastructs::tdigest::{TDigest, K1};
use stampede_core::{AggregateMetrics, IterationOutcome, LatencySummary, ScenarioStats};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Append-only accumulation for every scenario in a run.
///
/// Each scenario writes to its own accumulator; recording touches atomics and
/// a lock-free latency bucket only, so completing iterations in one scenario
/// never contend with dispatch in another. Quantile digests are merged lazily
/// on [`MetricsSink::snapshot`].
pub struct MetricsSink {
    scenarios: BTreeMap<Arc<str>, Arc<ScenarioAccumulator>>,
    overall: Arc<ScenarioAccumulator>,
}

impl MetricsSink {
    pub(crate) fn new() -> Self {
        Self {
            scenarios: BTreeMap::new(),
            overall: Arc::new(ScenarioAccumulator::new("total".into())),
        }
    }

    /// Register a scenario and hand back the write handle its runner records
    /// through. The scenario set is fixed before a run starts, so snapshots
    /// never race with registration.
    pub(crate) fn register(&mut self, name: &str) -> MetricsHandle {
        let name: Arc<str> = Arc::from(name);
        let accumulator = Arc::new(ScenarioAccumulator::new(name.clone()));
        self.scenarios.insert(name, accumulator.clone());
        MetricsHandle {
            scenario: accumulator,
            overall: self.overall.clone(),
        }
    }

    /// Read-only copy of the aggregate counters at this moment. Safe to call
    /// concurrently with a run; idempotent while no new outcomes arrive.
    pub fn snapshot(&self) -> AggregateMetrics {
        let scenarios: Vec<ScenarioStats> = self
            .scenarios
            .values()
            .map(|accumulator| accumulator.snapshot())
            .collect();
        let overall = self.overall.snapshot();

        AggregateMetrics {
            success: overall.success,
            error: overall.error,
            dropped: overall.dropped,
            latency: overall.latency,
            scenarios,
        }
    }
}

/// Write side of the sink for one scenario.
#[derive(Clone)]
pub(crate) struct MetricsHandle {
    scenario: Arc<ScenarioAccumulator>,
    overall: Arc<ScenarioAccumulator>,
}

impl MetricsHandle {
    pub fn record(&self, outcome: &IterationOutcome) {
        self.scenario.record(outcome);
        self.overall.record(outcome);

        #[cfg(feature = "metrics")]
        {
            let scenario = self.scenario.name.to_string();
            metrics::histogram!("stampede_iteration_latency", "scenario" => scenario.clone())
                .record(outcome.elapsed.as_nanos() as f64);
            if outcome.is_success() {
                metrics::counter!("stampede_iterations_success", "scenario" => scenario)
                    .increment(1);
            } else {
                metrics::counter!("stampede_iterations_error", "scenario" => scenario)
                    .increment(1);
            }
        }
    }

    pub fn record_dropped(&self) {
        self.scenario.dropped.fetch_add(1, Ordering::Relaxed);
        self.overall.dropped.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::counter!(
            "stampede_iterations_dropped",
            "scenario" => self.scenario.name.to_string()
        )
        .increment(1);
    }
}

struct ScenarioAccumulator {
    name: Arc<str>,
    success: AtomicU64,
    error: AtomicU64,
    dropped: AtomicU64,
    samples: AtomicU64,
    latency_sum_ns: AtomicU64,
    latency_min_ns: AtomicU64,
    latency_max_ns: AtomicU64,
    bucket: AtomicBucket<Duration>,
    digest: Mutex<TDigest<K1>>,
    error_classes: Mutex<BTreeMap<String, u64>>,
}

impl ScenarioAccumulator {
    fn new(name: Arc<str>) -> Self {
        Self {
            name,
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            samples: AtomicU64::new(0),
            latency_sum_ns: AtomicU64::new(0),
            latency_min_ns: AtomicU64::new(u64::MAX),
            latency_max_ns: AtomicU64::new(0),
            bucket: AtomicBucket::new(),
            digest: Mutex::new(default_tdigest()),
            error_classes: Mutex::new(BTreeMap::new()),
        }
    }

    fn record(&self, outcome: &IterationOutcome) {
        let nanos = outcome.elapsed.as_nanos() as u64;
        // The bucket and bounds go first, the sample count last, so a
        // concurrent snapshot never counts a sample whose latency it cannot
        // see yet.
        self.bucket.push(outcome.elapsed);
        self.latency_min_ns.fetch_min(nanos, Ordering::Relaxed);
        self.latency_max_ns.fetch_max(nanos, Ordering::Relaxed);
        self.latency_sum_ns.fetch_add(nanos, Ordering::Relaxed);
        match outcome.error_class() {
            None => {
                self.success.fetch_add(1, Ordering::Relaxed);
            }
            Some(class) => {
                self.error.fetch_add(1, Ordering::Relaxed);
                let mut classes = lock(&self.error_classes);
                *classes.entry(class.to_string()).or_insert(0) += 1;
            }
        }
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ScenarioStats {
        // Drain the lock-free bucket into the digest under the per-scenario
        // lock. TDigest does not support merge, so the digest is the one
        // long-lived store and the bucket is only ever a staging area.
        let mut digest = lock(&self.digest);
        self.bucket.clear_with(|durations| {
            for duration in durations {
                digest.insert(duration.as_secs_f64());
            }
        });

        let samples = self.samples.load(Ordering::Relaxed);
        let latency = if samples == 0 {
            LatencySummary::default()
        } else {
            let mean =
                Duration::from_nanos(self.latency_sum_ns.load(Ordering::Relaxed) / samples);
            let min_ns = self.latency_min_ns.load(Ordering::Relaxed);
            let max_ns = self.latency_max_ns.load(Ordering::Relaxed);
            if min_ns >= max_ns {
                // The K1 scale normalizes by the sample spread, so quantile
                // queries NaN out on a digest of identical values. Zero
                // spread also means every quantile is that one value.
                let flat = Duration::from_nanos(max_ns);
                LatencySummary {
                    samples,
                    mean,
                    p50: flat,
                    p90: flat,
                    p99: flat,
                }
            } else {
                LatencySummary {
                    samples,
                    mean,
                    p50: bounded_quantile(&digest, 0.5, min_ns, max_ns),
                    p90: bounded_quantile(&digest, 0.9, min_ns, max_ns),
                    p99: bounded_quantile(&digest, 0.99, min_ns, max_ns),
                }
            }
        };

        ScenarioStats {
            name: self.name.to_string(),
            success: self.success.load(Ordering::Relaxed),
            error: self.error.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            latency,
            error_classes: lock(&self.error_classes).clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Quantile query bounded by the observed extremes. The digest can briefly
/// trail the sample count while a record is in flight, in which case a query
/// yields NaN; report the observed ceiling instead.
fn bounded_quantile(digest: &TDigest<K1>, q: f64, min_ns: u64, max_ns: u64) -> Duration {
    let seconds = digest.quantile(q);
    if seconds.is_finite() {
        let clamped = seconds.clamp(min_ns as f64 / 1e9, max_ns as f64 / 1e9);
        Duration::from_secs_f64(clamped)
    } else {
        Duration::from_nanos(max_ns)
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}
