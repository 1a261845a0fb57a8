//! Guarded-state signalling shared by every pipeline stage.
//!
//! A [`Monitor`] pairs a mutex-protected value with a condvar. The two
//! operations `update_and_notify_all` and `wait_while` are the completion
//! pattern used throughout: pumps mutate a shared counter and wake waiters,
//! drivers sleep until a predicate over the counter turns false.

use parking_lot::{Condvar, Mutex};

pub struct Monitor<T> {
    state: Mutex<T>,
    cond: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(initial: T) -> Self {
        Self {
            state: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    /// Run `f` under the lock without signalling.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Mutate the guarded state, then wake all waiters.
    pub fn update_and_notify_all<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.state.lock());
        self.cond.notify_all();
        result
    }

    /// Block the calling thread while `pred` holds. Spurious wakeups are
    /// absorbed by the re-check loop.
    pub fn wait_while(&self, mut pred: impl FnMut(&T) -> bool) {
        let mut guard = self.state.lock();
        self.cond.wait_while(&mut guard, |state| pred(state));
    }

    /// Block while `pred` holds, then run `f` without releasing the lock in
    /// between, then wake all waiters. The wait-act pair is atomic, which is
    /// what a blocking queue's put/take need.
    pub fn wait_while_then<R>(
        &self,
        mut pred: impl FnMut(&T) -> bool,
        f: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut guard = self.state.lock();
        self.cond.wait_while(&mut guard, |state| pred(state));
        let result = f(&mut guard);
        self.cond.notify_all();
        result
    }
}
