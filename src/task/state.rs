//! Task lifecycle state machine
//!
//! Valid transitions:
//! 1. Submitted → Pending
//! 2. Submitted → Ready | Failed | NotFound
//! 3. Pending   → Pending
//! 4. Pending   → Ready | Failed | NotFound
//!
//! Ready, Failed and NotFound are terminal: nothing leaves them, not even a
//! self-loop. A caller that wants to retry must submit a new task.

use crate::errors::InvalidTransition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Accepted by the provider, never polled
    Submitted,

    /// Polled at least once, result not ready yet
    Pending,

    /// Result available (terminal)
    Ready,

    /// Provider reported a failure (terminal)
    Failed,

    /// Provider does not know the task or it expired (terminal)
    NotFound,
}

impl TaskState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Failed | TaskState::NotFound)
    }

    /// Attempt a transition to `next`
    pub fn transition(self, next: TaskState) -> Result<TaskState, InvalidTransition> {
        use TaskState::*;

        match (self, next) {
            (Submitted, Pending) | (Pending, Pending) => Ok(next),
            (Submitted, _) | (Pending, _) if next.is_terminal() => Ok(next),
            (from, to) => Err(InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Submitted => "submitted",
            TaskState::Pending => "pending",
            TaskState::Ready => "ready",
            TaskState::Failed => "failed",
            TaskState::NotFound => "not_found",
        };
        f.write_str(name)
    }
}
