//! Async Action Tracker: lifecycle of one user-triggered mutation
//! (upload, submit, create/update/delete) so a view can disable its button
//! while the call is in flight and show the outcome once.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::errors::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq)]
pub enum AsyncAction<T> {
    Idle,
    Pending,
    Succeeded(T),
    Failed(ApiError),
}

impl<T> Default for AsyncAction<T> {
    fn default() -> Self {
        AsyncAction::Idle
    }
}

impl<T> AsyncAction<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncAction::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AsyncAction::Succeeded(_) | AsyncAction::Failed(_))
    }
}

pub struct ActionTracker<T> {
    state: Mutex<AsyncAction<T>>,
}

impl<T: Clone> Default for ActionTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ActionTracker<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AsyncAction::Idle),
        }
    }

    /// Runs `op` unless a previous run is still pending.
    ///
    /// The tracker is `Pending` before `op` is first polled. A call made while
    /// pending does not invoke `op` and returns `Pending`. Otherwise the
    /// terminal state reached by this invocation is returned.
    pub async fn run<F, Fut>(&self, op: F) -> AsyncAction<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        {
            let mut state = self.lock();
            if state.is_pending() {
                debug!("action already pending; ignoring re-invocation");
                return AsyncAction::Pending;
            }
            *state = AsyncAction::Pending;
        }

        let mut guard = PendingGuard {
            tracker: self,
            armed: true,
        };
        let terminal = match op().await {
            Ok(value) => AsyncAction::Succeeded(value),
            Err(e) => AsyncAction::Failed(e),
        };
        guard.armed = false;

        *self.lock() = terminal.clone();
        terminal
    }

    pub fn state(&self) -> AsyncAction<T> {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_pending()
    }

    /// Hands out the terminal state once and returns to `Idle`.
    pub fn take_terminal(&self) -> Option<AsyncAction<T>> {
        let mut state = self.lock();
        if state.is_terminal() {
            Some(std::mem::replace(&mut *state, AsyncAction::Idle))
        } else {
            None
        }
    }

    /// Back to `Idle` so the action can be triggered again.
    /// Has no effect while a run is pending.
    pub fn reset(&self) {
        let mut state = self.lock();
        if !state.is_pending() {
            *state = AsyncAction::Idle;
        }
    }

    fn lock(&self) -> MutexGuard<'_, AsyncAction<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Returns the tracker to `Idle` if a run is dropped before completing.
struct PendingGuard<'a, T: Clone> {
    tracker: &'a ActionTracker<T>,
    armed: bool,
}

impl<T: Clone> Drop for PendingGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            debug!("pending action cancelled");
            *self.tracker.lock() = AsyncAction::Idle;
        }
    }
}
