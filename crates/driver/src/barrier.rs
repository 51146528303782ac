//! Initialization barrier
//!
//! A queue-and-replay gate for the window between driver construction and
//! connection readiness. The state machine is
//! `Pending(queue) -> Settled(outcome)` and transitions exactly once.
//!
//! While pending, submitted operations are appended to a FIFO queue. On
//! settle the queue drains in arrival order, each closure invoked exactly
//! once with the settlement outcome; after settling the barrier is a
//! pass-through and submitted operations run immediately on the caller's
//! thread.
//!
//! The queue drains outside the lock, so a replayed operation may itself
//! submit further work (model fan-out does) without deadlocking.

use packrat_core::Result;
use parking_lot::Mutex;

type PendingOperation = Box<dyn FnOnce(&Result<()>) + Send>;

enum BarrierState {
    Pending(Vec<PendingOperation>),
    Settled(Result<()>),
}

/// Queue-and-replay gate over connection readiness
pub struct InitBarrier {
    state: Mutex<BarrierState>,
}

impl Default for InitBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl InitBarrier {
    /// A barrier in the pending state with an empty queue
    pub fn new() -> Self {
        InitBarrier {
            state: Mutex::new(BarrierState::Pending(Vec::new())),
        }
    }

    /// Submit an operation
    ///
    /// Queued while pending; run immediately with the settlement outcome
    /// once settled. Each operation runs exactly once either way.
    pub fn submit<F>(&self, operation: F)
    where
        F: FnOnce(&Result<()>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.state.lock();
            match &mut *state {
                BarrierState::Pending(queue) => {
                    queue.push(Box::new(operation));
                    return;
                }
                BarrierState::Settled(outcome) => outcome.clone(),
            }
        };
        operation(&outcome);
    }

    /// Settle the barrier and replay the queue in arrival order
    ///
    /// Only the first settlement takes effect; later calls are ignored.
    pub fn settle(&self, outcome: Result<()>) {
        let drained = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, BarrierState::Settled(outcome.clone())) {
                BarrierState::Pending(queue) => queue,
                BarrierState::Settled(previous) => {
                    // Already settled; restore the original outcome.
                    *state = BarrierState::Settled(previous);
                    return;
                }
            }
        };
        for operation in drained {
            operation(&outcome);
        }
    }

    /// Whether the barrier has settled
    pub fn is_settled(&self) -> bool {
        matches!(&*self.state.lock(), BarrierState::Settled(_))
    }
}
