//! Run-scoped context shared by the maze, the controller and the harness.

use crate::error::EnvError;
use crate::types::RunId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// State owned by exactly one run.
///
/// Replaces process-wide flags: everything that must happen "at most once"
/// during a run is tracked here, so two runs in the same process never
/// leak state into each other.
///
/// - `claim_goal()` succeeds once; afterwards no cell can become the goal
/// - `bind_controller()` succeeds once; afterwards the controller is fixed
/// - the cancellation flag is the cooperative stop signal for the worker
/// - the first sandbox or integrity violation is kept for the verdict
/// - once the output is sealed, only the harness writes the result file
///
/// Cloning is cheap and every clone observes the same state.
#[derive(Debug, Clone)]
pub struct RunContext {
    inner: Arc<RunState>,
}

#[derive(Debug)]
struct RunState {
    /// Identifier used in logs and exports
    run_id: RunId,

    /// Seed the maze generators derive from (0 for external mazes)
    seed: u64,

    /// Creation time for monotonic duration calculations
    start: Instant,

    goal_assigned: AtomicBool,
    controller_bound: AtomicBool,
    cancelled: AtomicBool,

    /// First violation observed during the run
    violation: Mutex<Option<EnvError>>,

    /// `true` once the harness owns the output
    output_sealed: Mutex<bool>,
}

impl RunContext {
    /// Creates a new context with a random run id.
    pub fn new(seed: u64) -> Self {
        Self::with_run_id(RunId::new(), seed)
    }

    /// Creates a new context with an explicit run id.
    pub fn with_run_id(run_id: RunId, seed: u64) -> Self {
        Self {
            inner: Arc::new(RunState {
                run_id,
                seed,
                start: Instant::now(),
                goal_assigned: AtomicBool::new(false),
                controller_bound: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                violation: Mutex::new(None),
                output_sealed: Mutex::new(false),
            }),
        }
    }

    /// Returns the run identifier.
    pub fn run_id(&self) -> RunId {
        self.inner.run_id
    }

    /// Returns the context's seed (for logging/debugging).
    pub fn seed(&self) -> u64 {
        self.inner.seed
    }

    /// Returns the time elapsed since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.start.elapsed()
    }

    /// Claims the single goal slot of this run.
    ///
    /// Fails with `IllegalAction` on every call after the first one,
    /// whichever cell or maze the caller is working on.
    pub fn claim_goal(&self) -> Result<(), EnvError> {
        self.inner
            .goal_assigned
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| EnvError::illegal("ILLEGALLY SETTING GOAL"))
    }

    /// Returns true once a goal has been assigned.
    pub fn goal_assigned(&self) -> bool {
        self.inner.goal_assigned.load(Ordering::SeqCst)
    }

    /// Claims the single controller binding of this run.
    pub fn bind_controller(&self) -> Result<(), EnvError> {
        self.inner
            .controller_bound
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| EnvError::illegal("ILLEGALLY TRYING TO INITIALIZE MAZE"))
    }

    /// Returns true once the controller has been bound.
    pub fn controller_bound(&self) -> bool {
        self.inner.controller_bound.load(Ordering::SeqCst)
    }

    /// Signals cooperative cancellation to the worker running robot logic.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Records a violation. Only the first one is kept.
    pub fn record_violation(&self, err: &EnvError) {
        let mut slot = self
            .inner
            .violation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err.clone());
        }
    }

    /// Returns the first recorded violation, if any.
    pub fn violation(&self) -> Option<EnvError> {
        self.inner
            .violation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns true if the run must stop because of a violation.
    pub fn has_violation(&self) -> bool {
        self.violation().is_some()
    }

    /// Hands the output over to the harness. Waits for a logic write that is
    /// already in flight; every later `write_output` call fails.
    pub fn seal_output(&self) {
        *self
            .inner
            .output_sealed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn output_sealed(&self) -> bool {
        *self
            .inner
            .output_sealed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `write` unless the output is sealed. The seal cannot be set
    /// while `write` runs.
    pub fn write_output<F>(&self, write: F) -> Result<(), EnvError>
    where
        F: FnOnce() -> Result<(), EnvError>,
    {
        let sealed = self
            .inner
            .output_sealed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *sealed {
            return Err(EnvError::denied("write", "sealed output"));
        }
        write()
    }
}
