//! Provider wire types
//!
//! The provider wraps every answer in the same envelope:
//! `{ status_code, status_message, tasks: [{ id, status_code, status_message, result }] }`.
//! Fields the core does not interpret are kept in `extra` so nothing is lost
//! when a response is handed on to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One HTTP-shaped round trip result
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the HTTP status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Top-level provider envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderResponse {
    pub status_code: i64,

    #[serde(default)]
    pub status_message: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<TaskEnvelope>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One task entry inside the envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskEnvelope {
    #[serde(default)]
    pub id: Option<String>,

    pub status_code: i64,

    #[serde(default)]
    pub status_message: String,

    #[serde(default)]
    pub result: Option<Vec<Value>>,

    /// Provider hint for how long the task will take
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_wait_seconds: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskEnvelope {
    /// Whether the task carries at least one result entry
    pub fn has_result(&self) -> bool {
        self.result.as_ref().map_or(false, |items| !items.is_empty())
    }
}

impl ProviderResponse {
    /// Parse an envelope out of a raw JSON body
    pub fn from_value(body: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(body)
    }

    /// The task matching `task_id`, falling back to the first task
    pub fn task_for(&self, task_id: &str) -> Option<&TaskEnvelope> {
        self.tasks
            .iter()
            .find(|task| task.id.as_deref() == Some(task_id))
            .or_else(|| self.tasks.first())
    }
}

/// Canonical meaning of a provider status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBand {
    Success,
    Pending,
    NotFound,
    Other(i64),
}

/// Provider-specific status code constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBands {
    pub success: i64,
    pub not_found: i64,

    /// Task code for a freshly accepted submission
    pub created: i64,

    /// Extra codes that mean "still processing"
    pub pending: Vec<i64>,

    /// Rejections worth retrying later (rate limits, provider outages)
    pub retry_later: Vec<i64>,
}

impl Default for StatusBands {
    fn default() -> Self {
        Self {
            success: 20000,
            not_found: 40400,
            created: 20100,
            pending: Vec::new(),
            retry_later: vec![40202, 40209, 50000, 50301],
        }
    }
}

impl StatusBands {
    pub fn classify(&self, code: i64) -> StatusBand {
        if code == self.success {
            StatusBand::Success
        } else if code == self.not_found {
            StatusBand::NotFound
        } else if self.pending.contains(&code) {
            StatusBand::Pending
        } else {
            StatusBand::Other(code)
        }
    }

    /// Whether a task code means the provider accepted a submission
    pub fn accepts_submission(&self, code: i64) -> bool {
        code == self.created || code == self.success
    }

    pub fn is_retry_later(&self, code: i64) -> bool {
        self.retry_later.contains(&code)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TaskEnvelope>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<TaskEnvelope>>::deserialize(deserializer)?.unwrap_or_default())
}
