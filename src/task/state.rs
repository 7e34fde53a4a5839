//! Task state cell and the caller-facing handle

use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::types::{TaskId, TaskState};

/// State shared between a task, its handles and its worker
#[derive(Debug)]
pub(crate) struct TaskShared {
    id: TaskId,
    state: watch::Sender<TaskState>,
    // Set once the terminal state is reached and its callback has returned
    settled: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl TaskShared {
    pub(crate) fn new() -> Arc<Self> {
        let (state, _) = watch::channel(TaskState::Created);
        let (settled, _) = watch::channel(false);
        Arc::new(Self {
            id: TaskId::next(),
            state,
            settled,
            cancel: CancellationToken::new(),
        })
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Atomically move to `next` if the current state allows it
    ///
    /// Returns `false` and leaves the state untouched otherwise, which makes
    /// this the single point where terminal transitions are claimed.
    pub(crate) fn advance(&self, next: TaskState) -> bool {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Mark the task settled when the returned guard drops
    pub(crate) fn settle_on_drop(&self) -> SettleGuard<'_> {
        SettleGuard { shared: self }
    }

    pub(crate) fn cancel(&self) -> bool {
        if self.advance(TaskState::Cancelled) {
            self.settled.send_replace(true);
            self.cancel.cancel();
            tracing::debug!(task_id = %self.id, "fetch task cancelled");
            true
        } else {
            false
        }
    }

    pub(crate) async fn finished(&self) -> TaskState {
        let mut rx = self.settled.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = rx.wait_for(|settled| *settled).await;
        self.state()
    }
}

/// Settles a task when dropped, even if the callback panicked
pub(crate) struct SettleGuard<'a> {
    shared: &'a TaskShared,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.shared.settled.send_replace(true);
    }
}

/// Handle to an executing task
///
/// Returned by [`crate::FetchTask::execute`]. Clones refer to the same task.
#[derive(Clone, Debug)]
pub struct FetchHandle {
    shared: Arc<TaskShared>,
}

impl FetchHandle {
    pub(crate) fn new(shared: Arc<TaskShared>) -> Self {
        Self { shared }
    }

    /// Id of the task
    pub fn id(&self) -> TaskId {
        self.shared.id()
    }

    /// Current state of the task
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Cancel the task
    ///
    /// Interrupts a request that is queued or in flight and discards an
    /// outcome that has not been delivered yet. Returns `false` if the task
    /// had already reached a terminal state, in which case nothing changes.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Whether the task ended by cancellation
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Wait until the task reaches a terminal state
    ///
    /// For `Completed` and `Failed` this resolves only after the callback
    /// has returned.
    pub async fn finished(&self) -> TaskState {
        self.shared.finished().await
    }
}
