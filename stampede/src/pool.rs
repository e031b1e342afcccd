use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A bounded set of reusable virtual-user slots, private to one scenario.
///
/// Acquisition never blocks: executor strategies poll so that dispatch timing
/// is unaffected by pool contention. A failed acquisition is the trigger for
/// the dropped-iteration path in rate-based strategies.
pub(crate) struct WorkerPool {
    free: Mutex<Vec<usize>>,
    size: usize,
    released: Notify,
}

impl WorkerPool {
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            // Reversed so VU 0 is handed out first.
            free: Mutex::new((0..size).rev().collect()),
            size,
            released: Notify::new(),
        })
    }

    /// Take any free slot. `None` means the pool is saturated.
    pub fn try_acquire(self: &Arc<Self>) -> Option<Worker> {
        let vu = self.free_list().pop()?;
        Some(Worker {
            vu,
            pool: self.clone(),
        })
    }

    /// Take one specific slot, for strategies with per-VU work assignments.
    pub fn try_acquire_index(self: &Arc<Self>, vu: usize) -> Option<Worker> {
        let mut free = self.free_list();
        let pos = free.iter().position(|&i| i == vu)?;
        free.swap_remove(pos);
        drop(free);
        Some(Worker {
            vu,
            pool: self.clone(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[allow(unused)]
    pub fn idle(&self) -> usize {
        self.free_list().len()
    }

    /// Wait until some worker is released. A hint, not a handoff: callers
    /// re-poll acquisition afterwards.
    pub async fn released(&self) {
        self.released.notified().await;
    }

    fn free_list(&self) -> MutexGuard<'_, Vec<usize>> {
        // The critical sections are push/pop only, so a poisoned lock can only
        // mean an unrelated panic mid-drop; the list itself is still coherent.
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII permit for one virtual-user slot. Dropping it returns the slot to the
/// pool, so a slot is never shared by two concurrent iterations.
pub(crate) struct Worker {
    vu: usize,
    pool: Arc<WorkerPool>,
}

impl Worker {
    pub fn vu(&self) -> usize {
        self.vu
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.pool.free_list().push(self.vu);
        self.pool.released.notify_one();
    }
}
