use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::foundation::error::{FlythroughError, FlythroughResult};
use crate::foundation::interrupt::InterruptFlag;

/// Encode pipeline controller state.
///
/// The normal lifecycle is linear (`Unconfigured` → ... → `Closed`); `Failed` can be entered
/// from any state and is sticky.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Created, nothing negotiated yet.
    Unconfigured,
    /// Input format accepted by the sink.
    Configured,
    /// Track format selected and encoder resources allocated.
    Realized,
    /// Sink warmed up.
    Prefetched,
    /// Pull loop running.
    Started,
    /// Pull loop ended: finished, or stopped by an interrupt.
    Stopped,
    /// Resources released.
    Closed,
    /// A fatal error occurred.
    Failed,
}

impl PipelineState {
    fn rank(self) -> Option<u8> {
        match self {
            Self::Unconfigured => Some(0),
            Self::Configured => Some(1),
            Self::Realized => Some(2),
            Self::Prefetched => Some(3),
            Self::Started => Some(4),
            Self::Stopped => Some(5),
            Self::Closed => Some(6),
            Self::Failed => None,
        }
    }

    /// Return `true` when `self` is `target` or a later state of the normal lifecycle.
    ///
    /// `Failed` never reaches anything and is never reached.
    pub fn has_reached(self, target: PipelineState) -> bool {
        match (self.rank(), target.rank()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }

    /// Return `true` for `Closed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Realized => "realized",
            Self::Prefetched => "prefetched",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Current controller state guarded by a mutex, with a condition variable for waiters.
#[derive(Debug)]
pub struct StateCell {
    state: Mutex<PipelineState>,
    changed: Condvar,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    /// Create a cell in [`PipelineState::Unconfigured`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PipelineState::Unconfigured),
            changed: Condvar::new(),
        }
    }

    /// Current state.
    pub fn get(&self) -> PipelineState {
        *self.lock()
    }

    /// Move to `next` and wake all waiters. A failed cell stays failed.
    pub fn set(&self, next: PipelineState) {
        let mut state = self.lock();
        if *state == PipelineState::Failed {
            return;
        }
        let from = *state;
        tracing::debug!(%from, to = %next, "pipeline state transition");
        *state = next;
        self.changed.notify_all();
    }

    /// Enter [`PipelineState::Failed`] and wake all waiters.
    pub fn fail(&self) {
        let mut state = self.lock();
        let from = *state;
        tracing::debug!(%from, "pipeline failed");
        *state = PipelineState::Failed;
        self.changed.notify_all();
    }

    /// Block until the state reaches `target` or fails.
    ///
    /// Returns the state observed (`target`, a later state, or `Failed`). The predicate is
    /// rechecked after every wake-up; waits last at most `poll` so a raised `interrupt` or an
    /// elapsed `deadline` is noticed promptly and reported as [`FlythroughError::Interrupted`].
    pub fn await_state(
        &self,
        target: PipelineState,
        interrupt: &InterruptFlag,
        poll: Duration,
        deadline: Option<Instant>,
    ) -> FlythroughResult<PipelineState> {
        let mut state = self.lock();
        loop {
            if state.has_reached(target) || *state == PipelineState::Failed {
                return Ok(*state);
            }
            let wait = bounded_wait(interrupt, poll, deadline, || {
                format!("while waiting for the pipeline to become {target}")
            })?;
            state = self
                .changed
                .wait_timeout(state, wait)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Length of the next condition wait, or an interruption error when the caller must stop waiting.
pub(crate) fn bounded_wait(
    interrupt: &InterruptFlag,
    poll: Duration,
    deadline: Option<Instant>,
    what: impl FnOnce() -> String,
) -> FlythroughResult<Duration> {
    if interrupt.is_raised() {
        return Err(FlythroughError::interrupted(format!("interrupted {}", what())));
    }
    let poll = poll.max(Duration::from_millis(1));
    match deadline {
        None => Ok(poll),
        Some(deadline) => {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(FlythroughError::interrupted(format!(
                    "deadline elapsed {}",
                    what()
                )));
            }
            Ok(poll.min(left))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/state.rs"]
mod tests;
