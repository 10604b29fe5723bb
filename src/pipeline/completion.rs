use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::foundation::error::{FlythroughError, FlythroughResult};
use crate::foundation::interrupt::InterruptFlag;
use crate::pipeline::state::bounded_wait;

#[derive(Debug)]
enum Slot {
    Pending,
    Posted(FlythroughResult<()>),
    Consumed,
}

/// Single-shot terminal result of an encode run.
///
/// The first posted result wins; it is handed out once, to whichever waiter takes it first. Kept
/// separate from the state cell so frame production never contends with transition waiters.
#[derive(Debug)]
pub struct Completion {
    slot: Mutex<Slot>,
    done: Condvar,
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl Completion {
    /// Create an empty completion.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Pending),
            done: Condvar::new(),
        }
    }

    /// Record the terminal result. Returns `false` (and drops `result`) if one was already posted.
    pub fn post(&self, result: FlythroughResult<()>) -> bool {
        let mut slot = self.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Posted(result);
        self.done.notify_all();
        true
    }

    /// Return `true` once a result has been posted (taken or not).
    pub fn is_posted(&self) -> bool {
        !matches!(*self.lock(), Slot::Pending)
    }

    /// Take the posted result without waiting.
    pub fn take(&self) -> Option<FlythroughResult<()>> {
        let mut slot = self.lock();
        match std::mem::replace(&mut *slot, Slot::Consumed) {
            Slot::Posted(result) => Some(result),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Block until a result is posted and take it.
    ///
    /// Waits are bounded by `poll`; a raised `interrupt` or elapsed `deadline` ends the wait with
    /// [`FlythroughError::Interrupted`] and leaves the slot untouched.
    pub fn wait(
        &self,
        interrupt: &InterruptFlag,
        poll: Duration,
        deadline: Option<Instant>,
    ) -> FlythroughResult<()> {
        let mut slot = self.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Consumed) {
                Slot::Posted(result) => return result,
                Slot::Consumed => {
                    return Err(FlythroughError::pipeline(
                        "the pipeline result was already reported",
                    ));
                }
                Slot::Pending => *slot = Slot::Pending,
            }
            let wait = bounded_wait(interrupt, poll, deadline, || {
                "while waiting for the encode to complete".to_owned()
            })?;
            slot = self
                .done
                .wait_timeout(slot, wait)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/completion.rs"]
mod tests;
