#![allow(unused)]
use rand_distr::{Distribution, SkewNormal};
use stampede::prelude::*;
use std::time::Duration;

/// Iteration function that succeeds after a fixed delay.
pub fn fixed_latency(
    latency: Duration,
) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync + 'static {
    move |_ctx| {
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(())
        })
    }
}

/// Iteration function that always fails with the given classification.
pub fn failing(
    class: &'static str,
) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync + 'static {
    move |_ctx| Box::pin(async move { Err(IterationError::new(class)) })
}

/// Iteration function with skew-normal latency jitter around `mean`.
pub fn jittered_latency(
    mean: Duration,
    std: Duration,
) -> impl Fn(IterationContext) -> IterationFuture + Send + Sync + 'static {
    move |_ctx| {
        Box::pin(async move {
            let normal = SkewNormal::new(mean.as_secs_f64(), std.as_secs_f64(), 20.).unwrap();
            let v: f64 = normal.sample(&mut rand::thread_rng()).max(0.);
            tokio::time::sleep(Duration::from_secs_f64(v)).await;
            Ok(())
        })
    }
}
