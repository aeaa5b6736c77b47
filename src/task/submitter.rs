//! Task submission
//!
//! One call creates exactly one remote job. Submission is not idempotent:
//! the provider assigns a fresh id every time, so nothing here retries.

use crate::config::ProviderConfig;
use crate::errors::SubmissionError;
use crate::provider::{ProviderResponse, RemoteProvider, StatusBands};
use crate::task::TaskHandle;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Creates remote tasks and returns their handles
#[derive(Clone)]
pub struct TaskSubmitter {
    provider: Arc<dyn RemoteProvider>,
    bands: StatusBands,
    has_credentials: bool,
}

impl TaskSubmitter {
    pub fn new(provider: Arc<dyn RemoteProvider>, config: &ProviderConfig) -> Self {
        Self {
            provider,
            bands: config.status_codes.clone(),
            has_credentials: config.credentials().is_some(),
        }
    }

    /// Submit `payload` to `endpoint` and return the new task's handle
    pub async fn submit(
        &self,
        endpoint: &str,
        payload: Value,
    ) -> Result<TaskHandle, SubmissionError> {
        if !self.has_credentials {
            return Err(SubmissionError::MissingCredentials);
        }

        let response = self.provider.post_job(endpoint, payload).await?;
        debug!(endpoint, status = response.status, "submission response");

        if !response.is_success() {
            return Err(SubmissionError::TransportError {
                status_code: Some(response.status),
                message: format!("error creating task at {}", endpoint),
            });
        }

        let envelope = ProviderResponse::from_value(response.body)
            .map_err(|e| SubmissionError::MalformedResponse(e.to_string()))?;

        // A failing envelope usually carries no tasks at all
        if envelope.status_code != self.bands.success {
            return Err(self.rejected(envelope.status_code, envelope.status_message));
        }

        let task = envelope.tasks.into_iter().next().ok_or_else(|| {
            SubmissionError::MalformedResponse(format!(
                "no tasks in response ({}: {})",
                envelope.status_code, envelope.status_message
            ))
        })?;

        if !self.bands.accepts_submission(task.status_code) {
            return Err(self.rejected(task.status_code, task.status_message));
        }

        let id = task
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SubmissionError::MalformedResponse("task id missing".to_string()))?;

        info!(endpoint, task_id = %id, "task submitted");
        Ok(TaskHandle::new(id, task.estimated_wait_seconds))
    }

    fn rejected(&self, status_code: i64, status_message: String) -> SubmissionError {
        warn!(status_code, %status_message, "submission rejected");
        SubmissionError::Rejected {
            status_code,
            status_message,
            retry_later: self.bands.is_retry_later(status_code),
        }
    }
}
