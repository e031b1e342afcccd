//! Mixed CRUD workload against a person service on localhost:8080.
//!
//! Five scenarios run concurrently: a steady stream of creates, a bulk create
//! burst, a trickle of updates, and bounded batches of deletes and reads,
//! each with its own pool of virtual users and start offset.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use stampede::prelude::*;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

const BASE_URL: &str = "http://localhost:8080";
const THINK_TIME: Duration = Duration::from_millis(500);

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bob", "Charlie", "David", "Eve", "Frank", "Grace", "Heidi", "Ivy", "Jack", "Karen",
    "Leo", "Mona", "Nina", "Oscar", "Paul", "Quinn", "Rita", "Sam", "Tina", "Uma", "Vik", "Walt",
    "Xena", "Yuri", "Zane",
];
const LAST_NAMES: &[&str] = &[
    "Anderson", "Brown", "Clark", "Davis", "Evans", "Fisher", "Garcia", "Hill", "Irwin",
    "Johnson", "Keller", "Lopez", "Miller", "Nelson", "Owens", "Perez", "Quinn", "Roberts",
    "Smith", "Taylor", "Upton", "Vargas", "White", "Young", "Zimmer",
];

#[derive(Serialize)]
struct Person {
    first_name: &'static str,
    last_name: &'static str,
    email: String,
}

fn random_person() -> Person {
    let mut rng = rand::thread_rng();
    Person {
        first_name: FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Alice"),
        last_name: LAST_NAMES.choose(&mut rng).copied().unwrap_or("Smith"),
        email: format!("{:x}@example.com", rng.gen::<u64>()),
    }
}

fn random_id() -> u32 {
    rand::thread_rng().gen_range(0..1000)
}

fn classify(response: Result<reqwest::Response, reqwest::Error>) -> Result<(), IterationError> {
    let response = response.map_err(|err| {
        IterationError::new(if err.is_timeout() { "timeout" } else { "transport" })
    })?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(IterationError::new(format!(
            "http-{}",
            response.status().as_u16()
        )))
    }
}

fn create_person(client: Client) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync {
    move |_ctx| {
        let client = client.clone();
        Box::pin(async move {
            let response = client
                .post(format!("{BASE_URL}/person"))
                .json(&random_person())
                .send()
                .await;
            let outcome = classify(response);
            tokio::time::sleep(THINK_TIME).await;
            outcome
        })
    }
}

fn update_person(client: Client) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync {
    move |_ctx| {
        let client = client.clone();
        Box::pin(async move {
            let response = client
                .put(format!("{BASE_URL}/person/{}", random_id()))
                .json(&random_person())
                .send()
                .await;
            let outcome = classify(response);
            tokio::time::sleep(THINK_TIME).await;
            outcome
        })
    }
}

fn delete_person(client: Client) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync {
    move |_ctx| {
        let client = client.clone();
        Box::pin(async move {
            let response = client
                .delete(format!("{BASE_URL}/person/{}", random_id()))
                .send()
                .await;
            let outcome = classify(response);
            tokio::time::sleep(THINK_TIME).await;
            outcome
        })
    }
}

fn get_person(client: Client) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync {
    move |_ctx| {
        let client = client.clone();
        Box::pin(async move {
            let response = client
                .get(format!("{BASE_URL}/person/{}", random_id()))
                .send()
                .await;
            let outcome = classify(response);
            tokio::time::sleep(THINK_TIME).await;
            outcome
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter("stampede=debug")
        .init();

    // One client shared across all scenarios; building it inside an iteration
    // function would dominate the measurement.
    let client = Client::new();

    let orchestrator = match Orchestrator::configure(vec![
        ScenarioSpec::constant_arrival_rate(
            "create_users",
            50,
            Duration::from_secs(30),
            10,
            create_person(client.clone()),
        ),
        ScenarioSpec::shared_iterations("create_users_more", 50, 50_000, create_person(client.clone())),
        ScenarioSpec::constant_arrival_rate(
            "update_users",
            5,
            Duration::from_secs(30),
            5,
            update_person(client.clone()),
        )
        .start_after(Duration::from_secs(2)),
        ScenarioSpec::shared_iterations("delete_users", 10, 100, delete_person(client.clone()))
            .start_after(Duration::from_secs(10)),
        ScenarioSpec::shared_iterations("get_users", 20, 5_000, get_person(client))
            .start_after(Duration::from_secs(1)),
    ]) {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            eprintln!("configuration rejected: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = orchestrator.run(Some(Duration::from_secs(120))).await;
    print!("{report}");

    if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
