//! Error types for pageaudit
//!
//! Each layer owns its error enum; `AuditError` wraps them for callers that
//! run whole flows. Every error can report an [`ErrorClass`] so callers can
//! tell "try again later" apart from "this job will never complete" and
//! "fix your setup".

use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a failure from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient: the same request may succeed later
    RetryLater,

    /// The job will never complete; a new submission is required
    Permanent,

    /// Caller configuration must change before retrying
    Misconfiguration,
}

/// Failure to reach the provider at all
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP client errors (connection, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response whose body was not JSON
    #[error("unreadable response body: {0}")]
    Body(String),
}

/// Errors raised while creating a remote task
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("provider credentials are missing")]
    MissingCredentials,

    /// Non-success status, or no response at all when `status_code` is `None`
    #[error("transport error{}: {message}", status_suffix(.status_code))]
    TransportError {
        status_code: Option<u16>,
        message: String,
    },

    #[error("malformed submission response: {0}")]
    MalformedResponse(String),

    /// The provider answered but refused to create the task
    #[error("provider rejected the task with status {status_code}: {status_message}")]
    Rejected {
        status_code: i64,
        status_message: String,
        retry_later: bool,
    },
}

/// Errors raised while waiting on a remote task
#[derive(Error, Debug)]
pub enum PollError {
    #[error("transport error{}: {message}", status_suffix(.status_code))]
    TransportError {
        status_code: Option<u16>,
        message: String,
    },

    #[error("malformed task response: {0}")]
    MalformedResponse(String),

    #[error("task {task_id} was not found or has expired")]
    NotFound { task_id: String },

    #[error("task {task_id} failed with status {status_code}: {status_message}")]
    Failed {
        task_id: String,
        status_code: i64,
        status_message: String,
    },

    #[error("task {task_id} still pending after {attempts} queries ({elapsed:?})")]
    Timeout {
        task_id: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("polling task {task_id} was cancelled after {attempts} queries")]
    Cancelled { task_id: String, attempts: u32 },

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Errors raised by rule loading and scoring
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("rule set has no weighted metrics")]
    EmptyRuleSet,

    #[error("invalid rule '{key}': {reason}")]
    InvalidRule { key: String, reason: String },
}

/// Attempted transition out of a terminal task state, or backwards
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid task state transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

/// Main error type for end-to-end audit flows
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("submission failed: {0}")]
    Submission(#[from] SubmissionError),

    #[error("polling failed: {0}")]
    Poll(#[from] PollError),

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

fn status_suffix(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl From<ProviderError> for SubmissionError {
    fn from(err: ProviderError) -> Self {
        SubmissionError::TransportError {
            status_code: None,
            message: err.to_string(),
        }
    }
}

impl From<ProviderError> for PollError {
    fn from(err: ProviderError) -> Self {
        PollError::TransportError {
            status_code: None,
            message: err.to_string(),
        }
    }
}

impl SubmissionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SubmissionError::MissingCredentials => ErrorClass::Misconfiguration,
            SubmissionError::TransportError { .. } => ErrorClass::RetryLater,
            SubmissionError::MalformedResponse(_) => ErrorClass::Permanent,
            SubmissionError::Rejected { retry_later: true, .. } => ErrorClass::RetryLater,
            SubmissionError::Rejected { .. } => ErrorClass::Permanent,
        }
    }
}

impl PollError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PollError::TransportError { .. }
            | PollError::Timeout { .. }
            | PollError::Cancelled { .. } => ErrorClass::RetryLater,
            PollError::MalformedResponse(_)
            | PollError::NotFound { .. }
            | PollError::Failed { .. }
            | PollError::Transition(_) => ErrorClass::Permanent,
        }
    }
}

impl ScoringError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Misconfiguration
    }
}

impl AuditError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AuditError::Submission(err) => err.class(),
            AuditError::Poll(err) => err.class(),
            AuditError::Scoring(err) => err.class(),
            AuditError::Config(_) => ErrorClass::Misconfiguration,
            AuditError::Io(_) => ErrorClass::RetryLater,
            AuditError::Serialization(_) => ErrorClass::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = SubmissionError::TransportError {
            status_code: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "transport error (HTTP 502): bad gateway");

        let err = PollError::TransportError {
            status_code: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            SubmissionError::MissingCredentials.class(),
            ErrorClass::Misconfiguration
        );
        assert_eq!(
            PollError::NotFound { task_id: "t".to_string() }.class(),
            ErrorClass::Permanent
        );
        assert_eq!(
            PollError::Timeout {
                task_id: "t".to_string(),
                attempts: 3,
                elapsed: Duration::from_secs(600),
            }
            .class(),
            ErrorClass::RetryLater
        );
        assert_eq!(
            AuditError::from(ScoringError::EmptyRuleSet).class(),
            ErrorClass::Misconfiguration
        );
    }

    #[test]
    fn test_failed_error_mentions_code() {
        let err = PollError::Failed {
            task_id: "abc".to_string(),
            status_code: 40501,
            status_message: "Invalid Field".to_string(),
        };
        assert!(err.to_string().contains("40501"));
        assert!(err.to_string().contains("Invalid Field"));
    }
}
