//! Audit orchestrator - composition root
//!
//! Wires submission, polling and scoring together:
//! - fire-and-poll-later: `start` now, `check` on each external re-check
//! - poll-to-completion: `wait`, or `audit_page` for a scored result
//!
//! The first failure ends a flow; nothing is resubmitted. Orchestrations are
//! independent and share only the immutable rule set and the poller's
//! memory of settled tasks.

use crate::audit::catalog::{AnalysisKind, AnalysisRequest, DetailQuery, TASKS_READY_PATH};
use crate::config::Config;
use crate::errors::{AuditError, PollError, Result};
use crate::provider::{HttpProvider, ProviderResponse, RemoteProvider};
use crate::scoring::{MeasuredValues, MetricRuleSet, ScoreBreakdown, ScoringEngine};
use crate::task::{
    Cancellation, TaskHandle, TaskPayload, TaskResult, TaskResultPoller, TaskSubmitter,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Coordinates submit → poll → score flows
pub struct AuditOrchestrator {
    provider: Arc<dyn RemoteProvider>,
    submitter: TaskSubmitter,
    poller: TaskResultPoller,
    rules: Arc<MetricRuleSet>,
    engine: ScoringEngine,
}

impl AuditOrchestrator {
    /// Create an orchestrator over an existing provider client
    pub fn new(provider: Arc<dyn RemoteProvider>, config: &Config, rules: Arc<MetricRuleSet>) -> Self {
        Self {
            submitter: TaskSubmitter::new(provider.clone(), &config.provider),
            poller: TaskResultPoller::new(
                config.provider.status_codes.clone(),
                config.polling.clone(),
            ),
            provider,
            rules,
            engine: ScoringEngine::new(),
        }
    }

    /// Build the HTTP client and rule set described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = HttpProvider::new(&config.provider)
            .map_err(|e| AuditError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let rules = match &config.scoring.rules_path {
            Some(path) => MetricRuleSet::load(path)?,
            None => MetricRuleSet::on_page_benchmark(),
        };

        Ok(Self::new(Arc::new(provider), config, Arc::new(rules)))
    }

    pub fn rules(&self) -> &MetricRuleSet {
        &self.rules
    }

    /// Submit an analysis and return immediately
    pub async fn start(&self, request: &AnalysisRequest) -> Result<TaskHandle> {
        let handle = self
            .submitter
            .submit(request.kind.submit_path(), request.payload())
            .await?;

        info!(kind = %request.kind, target = %request.target, task_id = %handle.id, "analysis started");
        Ok(handle)
    }

    /// One re-check of a previously started analysis
    pub async fn check(&self, kind: AnalysisKind, task_id: &str) -> Result<TaskResult> {
        let result = self
            .poller
            .poll_path(self.provider.as_ref(), kind.result_path(), task_id)
            .await?;
        Ok(result)
    }

    /// Poll a started analysis until it settles
    pub async fn wait(
        &self,
        kind: AnalysisKind,
        handle: &TaskHandle,
        cancellation: Cancellation,
    ) -> Result<TaskPayload> {
        let payload = self
            .poller
            .poll_path_until_terminal(self.provider.as_ref(), kind.result_path(), &handle.id, cancellation)
            .await?;
        Ok(payload)
    }

    /// Filtered page or link listing of a finished site audit.
    ///
    /// Always a fresh round trip: the answer depends on the filters, not
    /// just the task id.
    pub async fn fetch_detail(&self, query: &DetailQuery) -> Result<TaskResult> {
        let result = self
            .poller
            .fetch(
                &query.task_id,
                self.provider.post_job(query.kind.path(), query.payload()),
            )
            .await?;

        debug!(kind = %query.kind, task_id = %query.task_id, state = %result.state(), "detail fetched");
        Ok(result)
    }

    /// Submit an instant-pages analysis for `url`, wait for it, and score it
    pub async fn audit_page(&self, url: &str, cancellation: Cancellation) -> Result<ScoreBreakdown> {
        let request = AnalysisRequest::new(AnalysisKind::InstantPages, url);
        let handle = self.start(&request).await?;
        let payload = self.wait(request.kind, &handle, cancellation).await?;

        let measured = self.rules.extract(&payload);
        debug!(task_id = %handle.id, metrics = measured.len(), "metrics extracted");

        self.score_measurements(url, &measured)
    }

    /// Score values measured elsewhere
    pub fn score_measurements(&self, url: &str, measured: &MeasuredValues) -> Result<ScoreBreakdown> {
        let breakdown = self.engine.score(url, measured, &self.rules)?;
        info!(url, score = breakdown.composite_score, tier = %breakdown.tier, "page scored");
        Ok(breakdown)
    }

    /// Ids of tasks the provider reports as ready for collection
    pub async fn tasks_ready(&self) -> Result<Vec<String>> {
        let response = self
            .provider
            .get_job(TASKS_READY_PATH, None)
            .await
            .map_err(PollError::from)?;

        if !response.is_success() {
            return Err(PollError::TransportError {
                status_code: Some(response.status),
                message: "error listing ready tasks".to_string(),
            }
            .into());
        }

        let envelope = ProviderResponse::from_value(response.body)
            .map_err(|e| PollError::MalformedResponse(e.to_string()))?;

        if envelope.status_code != self.poller.bands().success {
            return Err(PollError::Failed {
                task_id: TASKS_READY_PATH.to_string(),
                status_code: envelope.status_code,
                status_message: envelope.status_message,
            }
            .into());
        }

        let ids = envelope
            .tasks
            .iter()
            .flat_map(|task| task.result.iter().flatten())
            .filter_map(|entry| entry.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        Ok(ids)
    }
}
