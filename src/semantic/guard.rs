//! Run-once initialization shared between threads.
//!
//! Unlike `OnceLock`, a failed initialization is handed to every caller that
//! was waiting on that attempt, and the next call starts a fresh attempt.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

/// Observable state of an [`InitGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

enum Outcome<T, E> {
    Ready(Arc<T>),
    Failed(Arc<E>),
    /// The initializer panicked
    Abandoned,
}

/// One run of the initializer. Waiters keep a handle to the attempt they
/// blocked on and read its outcome, whatever later attempts do.
struct Attempt<T, E> {
    outcome: OnceLock<Outcome<T, E>>,
}

enum Slot<T, E> {
    Empty,
    Running(Arc<Attempt<T, E>>),
    Ready(Arc<T>),
}

/// Runs an initializer to completion at most once, even under concurrent
/// first calls.
pub struct InitGuard<T, E> {
    slot: Mutex<Slot<T, E>>,
    done: Condvar,
}

impl<T, E> Default for InitGuard<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> InitGuard<T, E> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            done: Condvar::new(),
        }
    }

    /// The initialized value, if initialization has completed.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> InitState {
        match &*self.lock() {
            Slot::Empty => InitState::Uninitialized,
            Slot::Running(_) => InitState::Initializing,
            Slot::Ready(_) => InitState::Ready,
        }
    }

    /// Return the initialized value, running `init` if nobody has yet.
    ///
    /// Callers arriving while another thread runs its initializer block
    /// until it finishes and share its outcome. On failure the guard goes
    /// back to uninitialized so a later call can retry.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<T>, Arc<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut slot = self.lock();
        loop {
            let running = match &*slot {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::Empty => break,
                Slot::Running(attempt) => attempt.clone(),
            };

            slot = self
                .done
                .wait_while(slot, |_| running.outcome.get().is_none())
                .unwrap_or_else(PoisonError::into_inner);

            match running.outcome.get() {
                Some(Outcome::Ready(value)) => return Ok(value.clone()),
                Some(Outcome::Failed(err)) => return Err(err.clone()),
                // abandoned by a panicking initializer, look again
                _ => {}
            }
        }

        let attempt = Arc::new(Attempt {
            outcome: OnceLock::new(),
        });
        *slot = Slot::Running(attempt.clone());
        drop(slot);

        // Resets the slot if `init` unwinds so waiters are not stuck forever.
        let abandon = AbandonOnUnwind {
            guard: self,
            attempt: &attempt,
        };
        let result = init();
        std::mem::forget(abandon);

        let mut slot = self.lock();
        let (outcome, result) = match result {
            Ok(value) => {
                let value = Arc::new(value);
                *slot = Slot::Ready(value.clone());
                (Outcome::Ready(value.clone()), Ok(value))
            }
            Err(err) => {
                let err = Arc::new(err);
                *slot = Slot::Empty;
                (Outcome::Failed(err.clone()), Err(err))
            }
        };
        // Published under the lock so a waiter cannot miss the wakeup.
        let _ = attempt.outcome.set(outcome);
        drop(slot);
        self.done.notify_all();

        result
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T, E>> {
        // The slot is only ever replaced whole, so a poisoned lock still
        // holds a consistent value.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct AbandonOnUnwind<'a, T, E> {
    guard: &'a InitGuard<T, E>,
    attempt: &'a Attempt<T, E>,
}

impl<T, E> Drop for AbandonOnUnwind<'_, T, E> {
    fn drop(&mut self) {
        let mut slot = self.guard.lock();
        let _ = self.attempt.outcome.set(Outcome::Abandoned);
        *slot = Slot::Empty;
        drop(slot);
        self.guard.done.notify_all();
    }
}
