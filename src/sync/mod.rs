//! The client-side synchronization engine: the aggregator that builds `Snapshot`s, the poll
//! scheduler, the alert monitor with its resolution coordinator, and the optimistic balance
//! mutator.

mod aggregator;
mod alert;
mod balance;
mod resolution;
mod scheduler;

pub use aggregator::{Aggregator, Refresh};
pub use alert::{
    Alert, AlertMonitor, AlertPrompt, AlertState, CheckOutcome, Notice, HIGH_VALUE_ALERT,
};
pub use balance::BalanceMutator;
pub use resolution::{Resolution, ResolutionCoordinator, ResolveFailure};
pub use scheduler::{Periods, PollScheduler};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tells in-flight work whether the view that started it is still mounted. Requests are never
/// cancelled, so every publisher checks this before touching shared state.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Marks the view as unmounted. There is no way back.
    pub fn end(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Locks `mutex`, recovering the data if a previous holder panicked. None of the guarded values
/// can be left half-updated, so the poison flag carries no information here.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[test]
fn liveness_is_shared_between_clones() {
    let liveness = Liveness::new();
    let clone = liveness.clone();
    assert!(clone.is_alive());
    liveness.end();
    assert!(!clone.is_alive());
}
