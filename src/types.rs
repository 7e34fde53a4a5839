//! Core types for fetch-task

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::FetchError;

/// Unique identifier for a task, assigned at construction
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Allocate the next process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task
///
/// Transitions only move forward:
///
/// ```text
/// Created ──> Running ──> Completed
///    │           ├──────> Failed
///    │           └──────> Cancelled
///    ├──────────────────> Failed     (pre-flight rejection)
///    └──────────────────> Cancelled
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Constructed, not yet executed
    Created,
    /// Executing: queued for a worker, fetching, decoding or awaiting delivery
    Running,
    /// `on_result` was delivered
    Completed,
    /// `on_error` was delivered
    Failed,
    /// Cancelled before delivery, no callback fires
    Cancelled,
}

impl TaskState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a forward transition
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Created, TaskState::Running) => true,
            (TaskState::Created, TaskState::Failed) => true,
            (TaskState::Created, TaskState::Cancelled) => true,
            (TaskState::Running, TaskState::Completed) => true,
            (TaskState::Running, TaskState::Failed) => true,
            (TaskState::Running, TaskState::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// HTTP request kind of a task
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestKind {
    /// HTTP GET, the only supported kind
    #[default]
    Get,
    /// Reserved. Selecting it fails the task with `InvalidInput` before any request is made.
    Post,
}

/// The single terminal outcome of a task execution
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<R> {
    /// Decoded value
    Value(R),
    /// Classified failure
    Error(FetchError),
}

impl<R> Outcome<R> {
    /// Convert into a standard `Result`
    pub fn into_result(self) -> std::result::Result<R, FetchError> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Error(e) => Err(e),
        }
    }

    /// The terminal state this outcome leads to
    pub fn terminal_state(&self) -> TaskState {
        match self {
            Outcome::Value(_) => TaskState::Completed,
            Outcome::Error(_) => TaskState::Failed,
        }
    }
}

impl<R> From<std::result::Result<R, FetchError>> for Outcome<R> {
    fn from(result: std::result::Result<R, FetchError>) -> Self {
        match result {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Error(e),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskState; 5] = [
        TaskState::Created,
        TaskState::Running,
        TaskState::Completed,
        TaskState::Failed,
        TaskState::Cancelled,
    ];

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(
                    !from.can_transition_to(to),
                    "{from} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn running_cannot_move_back_to_created() {
        assert!(!TaskState::Running.can_transition_to(TaskState::Created));
        assert!(!TaskState::Running.can_transition_to(TaskState::Running));
    }

    #[test]
    fn created_cannot_complete_without_running() {
        assert!(!TaskState::Created.can_transition_to(TaskState::Completed));
        assert!(TaskState::Created.can_transition_to(TaskState::Failed));
    }

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn outcome_maps_to_terminal_state() {
        let ok: Outcome<u8> = Outcome::Value(1);
        assert_eq!(ok.terminal_state(), TaskState::Completed);

        let err: Outcome<u8> = Outcome::Error(FetchError::io("reset"));
        assert_eq!(err.terminal_state(), TaskState::Failed);
        assert!(err.into_result().is_err());
    }

    #[test]
    fn request_kind_defaults_to_get() {
        assert_eq!(RequestKind::default(), RequestKind::Get);
        assert_eq!(serde_json::to_string(&RequestKind::Post).unwrap(), "\"POST\"");
    }
}
