mod utils;
#[allow(unused)]
use utils::*;

use stampede::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

#[test]
fn configure_rejects_duplicate_names() {
    let result = Orchestrator::configure(vec![
        ScenarioSpec::shared_iterations("a", 1, 1, fixed_latency(Duration::ZERO)),
        ScenarioSpec::shared_iterations("a", 1, 1, fixed_latency(Duration::ZERO)),
    ]);
    assert!(matches!(
        result,
        Err(ConfigurationError::DuplicateName(name)) if name == "a"
    ));
}

#[test]
fn configure_rejects_malformed_specs() {
    let result = Orchestrator::configure(vec![ScenarioSpec::constant_arrival_rate(
        "zero",
        0,
        Duration::from_secs(10),
        5,
        fixed_latency(Duration::ZERO),
    )]);
    assert!(matches!(
        result,
        Err(ConfigurationError::ZeroRate(name)) if name == "zero"
    ));
}

#[tokio::test(start_paused = true)]
async fn deadline_aborts_unfinished_scenarios() {
    let begin = Instant::now();
    let orchestrator = Orchestrator::configure(vec![
        ScenarioSpec::constant_arrival_rate(
            "slow",
            5,
            Duration::from_secs(30),
            5,
            fixed_latency(Duration::ZERO),
        ),
        ScenarioSpec::shared_iterations("quick", 2, 10, fixed_latency(Duration::from_millis(10))),
    ])
    .unwrap();

    let report = orchestrator.run(Some(Duration::from_secs(5))).await;
    assert_eq!(report.terminations["quick"], TerminationReason::Completed);
    assert_eq!(
        report.terminations["slow"],
        TerminationReason::DeadlineAborted
    );
    assert!(!report.success());

    // Only the iterations dispatched before the deadline are recorded.
    let slow = report
        .metrics
        .scenarios
        .iter()
        .find(|s| s.name == "slow")
        .unwrap();
    assert!(
        slow.success >= 24 && slow.success <= 27,
        "success={}",
        slow.success
    );

    // Nothing was in flight at the cutoff, so no grace period was consumed.
    assert!(begin.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn start_offsets_delay_scenarios() {
    let begin = Instant::now();
    let orchestrator = Orchestrator::configure(vec![ScenarioSpec::per_vu_iterations(
        "later",
        1,
        1,
        fixed_latency(Duration::from_secs(1)),
    )
    .start_after(Duration::from_secs(2))])
    .unwrap();

    let report = orchestrator.run(None).await;
    assert_eq!(report.metrics.success, 1);

    let elapsed = begin.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "elapsed={elapsed:?}");
    assert!(elapsed < Duration::from_millis(3500), "elapsed={elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_cancels_a_run() {
    let orchestrator = Orchestrator::configure(vec![ScenarioSpec::constant_arrival_rate(
        "endless",
        10,
        Duration::from_secs(60),
        5,
        fixed_latency(Duration::ZERO),
    )])
    .unwrap();

    let sink = orchestrator.metrics();
    let stop = orchestrator.stop_handle();
    let run = tokio::spawn(orchestrator.run(None));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let mid = sink.snapshot();
    assert!(
        mid.success >= 9 && mid.success <= 12,
        "success={}",
        mid.success
    );

    stop.stop();
    let report = run.await.unwrap();
    assert_eq!(
        report.terminations["endless"],
        TerminationReason::DeadlineAborted
    );
    assert!(!report.success());
}

#[tokio::test(start_paused = true)]
async fn progress_is_observable_during_a_run() {
    let orchestrator = Orchestrator::configure(vec![ScenarioSpec::shared_iterations(
        "tracked",
        2,
        20,
        fixed_latency(Duration::from_millis(100)),
    )
    .start_after(Duration::from_secs(1))])
    .unwrap();

    let progress = orchestrator.progress();
    let tracked = &progress["tracked"];
    assert_eq!(tracked.state(), ScenarioState::Pending);

    let run = tokio::spawn(orchestrator.run(None));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(tracked.state(), ScenarioState::Running);
    assert!(tracked.started() >= 2, "started={}", tracked.started());

    let report = run.await.unwrap();
    assert!(report.success());
    assert_eq!(tracked.state(), ScenarioState::Done);
    assert_eq!(tracked.completed(), 20);
    assert!(!tracked.aborted());
}

#[tokio::test(start_paused = true)]
async fn failed_iterations_never_abort_a_scenario() {
    let orchestrator = Orchestrator::configure(vec![ScenarioSpec::shared_iterations(
        "flaky",
        2,
        10,
        failing("boom"),
    )])
    .unwrap();

    let report = orchestrator.run(None).await;
    assert_eq!(report.terminations["flaky"], TerminationReason::Completed);
    assert!(report.success());
    assert_eq!(report.metrics.error, 10);
    assert_eq!(report.metrics.success, 0);
    assert_eq!(
        report.metrics.scenarios[0].error_classes.get("boom"),
        Some(&10)
    );
}

#[tokio::test(start_paused = true)]
async fn snapshots_are_idempotent_without_new_outcomes() {
    let orchestrator = Orchestrator::configure(vec![ScenarioSpec::shared_iterations(
        "once",
        3,
        30,
        fixed_latency(Duration::from_millis(2)),
    )])
    .unwrap();

    let sink = orchestrator.metrics();
    let report = orchestrator.run(None).await;

    let first = sink.snapshot();
    let second = sink.snapshot();
    assert_eq!(first, second);
    assert_eq!(first, report.metrics);
}

#[tokio::test(start_paused = true)]
async fn multi_scenario_mix_completes_independently() {
    let orchestrator = Orchestrator::configure(vec![
        ScenarioSpec::constant_arrival_rate(
            "writes",
            20,
            Duration::from_secs(10),
            10,
            fixed_latency(Duration::from_millis(50)),
        ),
        ScenarioSpec::shared_iterations("reads", 10, 500, fixed_latency(Duration::from_millis(5)))
            .start_after(Duration::from_secs(1)),
        ScenarioSpec::per_vu_iterations("deletes", 5, 20, fixed_latency(Duration::from_millis(5)))
            .start_after(Duration::from_secs(2)),
    ])
    .unwrap();

    let report = orchestrator.run(None).await;
    assert!(report.success());
    assert_eq!(report.metrics.total(), 200 + 500 + 100);
    assert_eq!(report.metrics.dropped, 0);

    let names: Vec<&str> = report
        .metrics
        .scenarios
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, ["deletes", "reads", "writes"]);
}
