use super::Decision;
use crate::pool::WorkerPool;
use std::sync::Arc;

/// Fixed total amount of work pulled from a shared counter by whichever
/// worker is free. No timing target, so saturation waits rather than drops.
pub(crate) struct SharedIterations {
    remaining: u64,
}

impl SharedIterations {
    pub fn new(iterations: u64) -> Self {
        Self {
            remaining: iterations,
        }
    }

    pub fn decide(&mut self, pool: &Arc<WorkerPool>) -> Decision {
        if self.remaining == 0 {
            return Decision::Drain;
        }
        match pool.try_acquire() {
            Some(worker) => {
                self.remaining -= 1;
                Decision::Dispatch(worker)
            }
            None => Decision::AwaitSlot,
        }
    }
}
