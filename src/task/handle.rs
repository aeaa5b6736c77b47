use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::task::TaskState;

/// Identifies one submitted remote job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: String,
    pub submitted_at: DateTime<Utc>,

    /// Absent means unknown, not zero
    pub estimated_wait_seconds: Option<f64>,
}

impl TaskHandle {
    pub fn new(id: impl Into<String>, estimated_wait_seconds: Option<f64>) -> Self {
        Self {
            id: id.into(),
            submitted_at: Utc::now(),
            estimated_wait_seconds,
        }
    }

    /// Estimated wait as a duration, when the provider supplied a usable one
    pub fn estimated_wait(&self) -> Option<Duration> {
        self.estimated_wait_seconds
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// Result set of a task that reached `Ready`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task_id: String,
    pub result: Vec<Value>,

    /// Task fields the core does not interpret
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Outcome of one poll round trip
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Ready(TaskPayload),
    Pending,
    NotFound,
    Failed {
        status_code: i64,
        status_message: String,
    },
}

impl TaskResult {
    pub fn state(&self) -> TaskState {
        match self {
            TaskResult::Ready(_) => TaskState::Ready,
            TaskResult::Pending => TaskState::Pending,
            TaskResult::NotFound => TaskState::NotFound,
            TaskResult::Failed { .. } => TaskState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_wait_unknown_is_none() {
        let handle = TaskHandle::new("abc", None);
        assert_eq!(handle.estimated_wait(), None);

        let handle = TaskHandle::new("abc", Some(-3.0));
        assert_eq!(handle.estimated_wait(), None);

        let handle = TaskHandle::new("abc", Some(1.5));
        assert_eq!(handle.estimated_wait(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_result_states() {
        assert_eq!(TaskResult::Pending.state(), TaskState::Pending);
        assert!(!TaskResult::Pending.is_terminal());
        assert!(TaskResult::NotFound.is_terminal());
        assert!(TaskResult::Failed {
            status_code: 50000,
            status_message: "Internal Error.".to_string(),
        }
        .is_terminal());
    }
}
