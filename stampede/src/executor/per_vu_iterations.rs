use super::Decision;
use crate::pool::WorkerPool;
use std::sync::Arc;

/// Each worker runs its own fixed count: a shared-iterations shape with a
/// private counter per VU, so no VU ever executes more than its budget.
pub(crate) struct PerVuIterations {
    remaining: Vec<u64>,
}

impl PerVuIterations {
    pub fn new(vus: usize, iterations_per_vu: u64) -> Self {
        Self {
            remaining: vec![iterations_per_vu; vus],
        }
    }

    pub fn decide(&mut self, pool: &Arc<WorkerPool>) -> Decision {
        let mut exhausted = true;
        for (vu, remaining) in self.remaining.iter_mut().enumerate() {
            if *remaining == 0 {
                continue;
            }
            exhausted = false;
            if let Some(worker) = pool.try_acquire_index(vu) {
                *remaining -= 1;
                return Decision::Dispatch(worker);
            }
        }
        if exhausted {
            Decision::Drain
        } else {
            Decision::AwaitSlot
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vu_gets_its_budget() {
        let mut strategy = PerVuIterations::new(3, 4);
        let pool = WorkerPool::new(3);

        let mut per_vu = [0u64; 3];
        loop {
            match strategy.decide(&pool) {
                Decision::Dispatch(worker) => {
                    per_vu[worker.vu()] += 1;
                    drop(worker);
                }
                Decision::Drain => break,
                _ => panic!("free pool never makes a per-VU strategy wait"),
            }
        }
        assert_eq!(per_vu, [4, 4, 4]);
    }

    #[test]
    fn busy_vu_with_budget_left_means_wait() {
        let mut strategy = PerVuIterations::new(2, 1);
        let pool = WorkerPool::new(2);

        // Exhaust VU 1's budget, then occupy VU 0 externally.
        let first = pool.try_acquire_index(0).unwrap();
        match strategy.decide(&pool) {
            Decision::Dispatch(worker) => assert_eq!(worker.vu(), 1),
            _ => panic!("VU 1 is free and has budget"),
        }
        assert!(matches!(strategy.decide(&pool), Decision::AwaitSlot));

        drop(first);
        match strategy.decide(&pool) {
            Decision::Dispatch(worker) => assert_eq!(worker.vu(), 0),
            _ => panic!("VU 0 is free again"),
        }
        assert!(matches!(strategy.decide(&pool), Decision::Drain));
    }
}
