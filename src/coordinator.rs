//! Render coordinator ("dirty lock").
//!
//! Guarantees at most one raster pass per view and coalesces any number of
//! invalidations that arrive during a pass into exactly one follow-up pass.
//!
//! ```text
//!            try_acquire            mark_dirty
//!   Idle ───────────────▶ Running ───────────▶ RunningDirty
//!    ▲                       │                     │
//!    │      release → false  │                     │ release → true
//!    └───────────────────────┴─────────────────────┘
//! ```
//!
//! Lock-free: every transition is a single compare-exchange on an `AtomicU8`,
//! so the paint path can read the state without blocking a worker.

use std::sync::atomic::{AtomicU8, Ordering};

use log::trace;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const RUNNING_DIRTY: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Running,
    /// Running, and at least one invalidation arrived since the pass started.
    RunningDirty,
}

impl CoordinatorState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => Self::Running,
            RUNNING_DIRTY => Self::RunningDirty,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug)]
pub struct RenderCoordinator {
    state: AtomicU8,
}

impl Default for RenderCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderCoordinator {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Start a pass. Succeeds only from `Idle`; the caller that gets `true`
    /// owns the pass and must call [`release`](Self::release) or
    /// [`release_cancelled`](Self::release_cancelled) exactly once.
    pub fn try_acquire(&self) -> bool {
        let acquired = self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        trace!("coordinator: try_acquire -> {acquired}");
        acquired
    }

    /// Record an invalidation against the running pass.
    ///
    /// Returns `true` if a pass is running and will be followed by another.
    /// `false` means the state was `Idle`: the pass already released and the
    /// caller should try to acquire instead.
    pub fn mark_dirty(&self) -> bool {
        match self
            .state
            .compare_exchange(RUNNING, RUNNING_DIRTY, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == RUNNING_DIRTY,
        }
    }

    /// Finish a pass. Returns whether another pass is needed.
    pub fn release(&self) -> bool {
        let prev = self.state.swap(IDLE, Ordering::AcqRel);
        let dirty = prev == RUNNING_DIRTY;
        trace!("coordinator: release (dirty={dirty})");
        dirty
    }

    /// Finish a cancelled pass. A cancelled pass never produced a complete
    /// image, so another one is always needed.
    pub fn release_cancelled(&self) -> bool {
        self.state.store(IDLE, Ordering::Release);
        trace!("coordinator: release after cancel");
        true
    }

    /// Force `Idle`, discarding any pending invalidation. For view teardown.
    pub fn reset(&self) {
        self.state.store(IDLE, Ordering::Release);
    }

    pub fn state(&self) -> CoordinatorState {
        CoordinatorState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() != CoordinatorState::Idle
    }

    /// Request a pass: acquire if idle, otherwise mark the running pass
    /// dirty. Retries when a release lands between the two attempts so the
    /// invalidation is never lost. Returns `true` if the caller acquired.
    pub fn request(&self) -> bool {
        loop {
            if self.try_acquire() {
                return true;
            }
            if self.mark_dirty() {
                return false;
            }
        }
    }
}
