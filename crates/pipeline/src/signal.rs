use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::PipelineError;

/// Run-wide cancellation flag shared by the generator, the processor and
/// whoever drives them. Cloning yields another handle to the same flag.
///
/// Signals form a tree: cancelling one also cancels every [`child`](Self::child)
/// created from it, but never its parent.
#[derive(Clone, Default)]
pub struct RunSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    cv: Condvar,
}

#[derive(Default)]
struct State {
    cancelled: bool,
    children: Vec<Weak<Inner>>,
}

impl RunSignal {
    pub fn new() -> Self { Self::default() }

    /// New signal that is cancelled along with `self`. Starts cancelled if
    /// `self` already is.
    pub fn child(&self) -> RunSignal {
        let child = RunSignal::new();
        let mut state = self.inner.state.lock();
        if state.cancelled {
            child.inner.state.lock().cancelled = true;
        } else {
            state.children.retain(|c| c.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Idempotent. Wakes every thread parked in [`pause`](Self::pause), on this
    /// signal and on all of its descendants.
    pub fn cancel(&self) {
        let children = {
            let mut state = self.inner.state.lock();
            state.cancelled = true;
            std::mem::take(&mut state.children)
        };
        self.inner.cv.notify_all();
        for child in children.iter().filter_map(Weak::upgrade) {
            RunSignal { inner: child }.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool { self.inner.state.lock().cancelled }

    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() { Err(PipelineError::Cancelled) } else { Ok(()) }
    }

    /// Sleep for `dur`, returning early with [`PipelineError::Cancelled`] if the
    /// run is cancelled meanwhile. A `dur` too large for a deadline sleeps
    /// until cancelled.
    pub fn pause(&self, dur: Duration) -> Result<(), PipelineError> {
        let mut state = self.inner.state.lock();
        if state.cancelled {
            return Err(PipelineError::Cancelled);
        }
        match Instant::now().checked_add(dur) {
            Some(deadline) => {
                while !state.cancelled {
                    if self.inner.cv.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while !state.cancelled {
                    self.inner.cv.wait(&mut state);
                }
            }
        }
        if state.cancelled { Err(PipelineError::Cancelled) } else { Ok(()) }
    }
}

impl std::fmt::Debug for RunSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSignal").field("cancelled", &self.is_cancelled()).finish()
    }
}
