use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// The lifecycle state of an inventory dumper.
///
/// States advance one way: `Created` becomes `Running` on start, and a running dump
/// terminates as either `Finished` (scan exhausted) or `Stopped` (external stop request
/// or error).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DumperState {
    Created,
    Running,
    Finished,
    Stopped,
}

impl fmt::Display for DumperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumperState::Created => write!(f, "created"),
            DumperState::Running => write!(f, "running"),
            DumperState::Finished => write!(f, "finished"),
            DumperState::Stopped => write!(f, "stopped"),
        }
    }
}

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const STOPPED: u8 = 3;

/// Cloneable handle onto the shared lifecycle state of one dumper.
///
/// The dump loop re-reads [`DumperHandle::is_running`] between rows, so flipping the
/// state from another task ends the dump after at most one more row.
#[derive(Debug, Clone)]
pub struct DumperHandle {
    state: Arc<AtomicU8>,
}

impl DumperHandle {
    pub fn new() -> DumperHandle {
        Self {
            state: Arc::new(AtomicU8::new(CREATED)),
        }
    }

    /// Moves the dumper from `Created` to `Running`.
    ///
    /// Returns whether the transition applied; it does not when the dumper was already
    /// started or has terminated.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks a running dump as cleanly finished. Has no effect in any other state.
    pub fn finish(&self) -> bool {
        self.state
            .compare_exchange(RUNNING, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Requests the dumper to stop.
    ///
    /// A dump that already finished stays finished; every other state moves to the
    /// terminal `Stopped` state.
    pub fn stop(&self) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state != FINISHED).then_some(STOPPED)
            });
    }

    /// Returns whether the dump loop should keep processing rows.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DumperState {
        match self.state.load(Ordering::Acquire) {
            CREATED => DumperState::Created,
            RUNNING => DumperState::Running,
            FINISHED => DumperState::Finished,
            _ => DumperState::Stopped,
        }
    }
}

impl Default for DumperHandle {
    fn default() -> Self {
        Self::new()
    }
}
