//! Guard for the process-wide IR builder state.
//!
//! The graph library's program tables are meant to exist once per
//! compilation; building IR twice concurrently would interleave entity
//! tables. The guard is a move-only token acquired at program start:
//! creating a second one while the first lives fails with [StateError].

use std::sync::atomic::{AtomicBool, Ordering};

static STATE_LIVE: AtomicBool = AtomicBool::new(false);

/// The IR library state is already held by another guard.
#[derive(Debug, thiserror::Error)]
#[error("the global IR state is already initialized")]
pub struct StateError;

/// RAII witness of exclusive ownership of the global IR state.
///
/// Move-only by construction; dropping it releases the state.
#[derive(Debug)]
pub struct GlobalIrState {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl GlobalIrState {
    /// Initializes the global state, failing if a guard is already live.
    pub fn initialize() -> Result<Self, StateError> {
        if STATE_LIVE.swap(true, Ordering::AcqRel) {
            return Err(StateError);
        }
        log::debug!(target: "irbuild", "global IR state initialized");
        Ok(Self { _not_send: std::marker::PhantomData })
    }
}

impl Drop for GlobalIrState {
    fn drop(&mut self) {
        STATE_LIVE.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_guard_is_live() {
        // this test owns the state for its whole duration; other tests in
        // this binary acquire it through the same entry point and would
        // race, so everything lives in this one test
        let first = GlobalIrState::initialize().expect("first guard");
        assert!(GlobalIrState::initialize().is_err());
        // moving the guard does not release the state
        let moved = first;
        assert!(GlobalIrState::initialize().is_err());
        drop(moved);
        let again = GlobalIrState::initialize().expect("released after drop");
        drop(again);
    }
}
