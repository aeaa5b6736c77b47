//! pageaudit - remote page analysis and health scoring
//!
//! Submits analyses to a remote SEO data provider, polls them until they
//! settle, and turns measured page metrics into a weighted health score.
//!
//! # Architecture
//!
//! - **provider**: HTTP client and the provider response envelope
//! - **task**: submit-then-poll lifecycle with backoff and cancellation
//! - **scoring**: metric rules and the weighted scoring engine
//! - **audit**: analysis catalog and the orchestrator that composes the above

pub mod errors;
pub mod config;
pub mod provider;
pub mod task;
pub mod scoring;
pub mod audit;

// Re-export commonly used types
pub use errors::{AuditError, ErrorClass, PollError, Result, ScoringError, SubmissionError};
pub use config::Config;
pub use audit::{AnalysisKind, AnalysisRequest, AuditOrchestrator};
pub use scoring::{MetricRuleSet, ScoreBreakdown, ScoringEngine, Tier};
pub use task::{Cancellation, TaskHandle, TaskResult};

// Command-line surface
pub mod cli;
pub mod telemetry;
