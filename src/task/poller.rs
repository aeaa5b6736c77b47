//! Task result polling
//!
//! Two call shapes share one interpretation of provider answers:
//! - [`TaskResultPoller::poll`]: a single round trip, for callers that
//!   schedule their own re-checks
//! - [`TaskResultPoller::poll_until_terminal`]: loops with the backoff
//!   policy until the task settles, the budget runs out, or the caller
//!   cancels
//!
//! Terminal outcomes are remembered per task id, so a settled task never
//! reads as pending again. The memory is an LRU bounded by
//! `BackoffPolicy::settled_capacity`; an evicted task is simply queried again.

use crate::errors::{PollError, ProviderError};
use crate::provider::{
    ProviderResponse, RawResponse, RemoteProvider, StatusBand, StatusBands, TaskEnvelope,
};
use crate::task::{BackoffPolicy, Cancellation, TaskPayload, TaskResult, TaskState};
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Interprets provider answers and drives the pending-retry loop
#[derive(Debug)]
pub struct TaskResultPoller {
    bands: StatusBands,
    policy: BackoffPolicy,
    settled: Mutex<LruCache<String, TaskResult>>,
}

impl TaskResultPoller {
    pub fn new(bands: StatusBands, policy: BackoffPolicy) -> Self {
        let capacity = NonZeroUsize::new(policy.settled_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            bands,
            policy,
            settled: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn bands(&self) -> &StatusBands {
        &self.bands
    }

    /// Number of settled outcomes currently remembered
    pub fn settled_len(&self) -> usize {
        self.settled().len()
    }

    /// One round trip that bypasses the settled memory and records nothing.
    ///
    /// For queries whose answer depends on more than the task id, such as
    /// filtered page listings of a finished crawl.
    pub async fn fetch<Fut>(&self, task_id: &str, query: Fut) -> Result<TaskResult, PollError>
    where
        Fut: Future<Output = Result<RawResponse, ProviderError>>,
    {
        let response = query.await?;
        let result = self.interpret(task_id, response)?;
        debug!(task_id, state = %result.state(), "fetch result");
        Ok(result)
    }

    /// One round trip. `query` receives the task id and performs the call.
    pub async fn poll<Q, Fut>(&self, task_id: &str, query: Q) -> Result<TaskResult, PollError>
    where
        Q: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<RawResponse, ProviderError>>,
    {
        if let Some(settled) = self.settled_result(task_id) {
            debug!(task_id, state = %settled.state(), "task already settled");
            return Ok(settled);
        }

        let response = query(task_id.to_string()).await?;
        let result = self.interpret(task_id, response)?;
        debug!(task_id, state = %result.state(), "poll result");

        if result.is_terminal() {
            self.remember(task_id, &result);
        }
        Ok(result)
    }

    /// Poll until the task reaches a terminal state.
    ///
    /// Only `Pending` answers are retried. `NotFound` and `Failed` end the loop
    /// at once, as do transport and parse errors.
    pub async fn poll_until_terminal<Q, Fut>(
        &self,
        task_id: &str,
        mut query: Q,
        mut cancellation: Cancellation,
    ) -> Result<TaskPayload, PollError>
    where
        Q: FnMut(String) -> Fut,
        Fut: Future<Output = Result<RawResponse, ProviderError>>,
    {
        let started = Instant::now();
        let budget = self.policy.max_elapsed();
        let mut state = TaskState::Submitted;
        let mut attempts: u32 = 0;

        loop {
            if cancellation.is_cancelled() {
                return Err(cancelled(task_id, attempts));
            }

            let result = self.poll(task_id, |id| query(id)).await?;
            attempts += 1;
            state = state.transition(result.state())?;

            match result {
                TaskResult::Ready(payload) => {
                    info!(task_id, attempts, "task ready");
                    return Ok(payload);
                }
                TaskResult::NotFound => {
                    info!(task_id, attempts, "task not found");
                    return Err(PollError::NotFound {
                        task_id: task_id.to_string(),
                    });
                }
                TaskResult::Failed {
                    status_code,
                    status_message,
                } => {
                    info!(task_id, attempts, status_code, "task failed");
                    return Err(PollError::Failed {
                        task_id: task_id.to_string(),
                        status_code,
                        status_message,
                    });
                }
                TaskResult::Pending => {}
            }

            let delay = self.policy.delay_for(attempts - 1);
            let elapsed = started.elapsed();
            if elapsed + delay > budget {
                info!(task_id, attempts, ?elapsed, "polling budget exhausted");
                return Err(PollError::Timeout {
                    task_id: task_id.to_string(),
                    attempts,
                    elapsed,
                });
            }

            debug!(task_id, attempts, ?delay, %state, "task pending, backing off");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancellation.cancelled() => {
                    return Err(cancelled(task_id, attempts));
                }
            }
        }
    }

    /// Single round trip against `{prefix}/{task_id}` on `provider`
    pub async fn poll_path(
        &self,
        provider: &dyn RemoteProvider,
        prefix: &str,
        task_id: &str,
    ) -> Result<TaskResult, PollError> {
        self.poll(task_id, |id| {
            let path = result_path(prefix, &id);
            async move { provider.get_job(&path, None).await }
        })
        .await
    }

    /// Poll `{prefix}/{task_id}` on `provider` until terminal
    pub async fn poll_path_until_terminal(
        &self,
        provider: &dyn RemoteProvider,
        prefix: &str,
        task_id: &str,
        cancellation: Cancellation,
    ) -> Result<TaskPayload, PollError> {
        self.poll_until_terminal(
            task_id,
            |id| {
                let path = result_path(prefix, &id);
                async move { provider.get_job(&path, None).await }
            },
            cancellation,
        )
        .await
    }

    /// Map one provider answer onto a task result
    fn interpret(&self, task_id: &str, response: RawResponse) -> Result<TaskResult, PollError> {
        if !response.is_success() {
            return Err(PollError::TransportError {
                status_code: Some(response.status),
                message: format!("error fetching result for task {}", task_id),
            });
        }

        let envelope = ProviderResponse::from_value(response.body)
            .map_err(|e| PollError::MalformedResponse(e.to_string()))?;

        // A failing envelope speaks for all of its tasks
        if self.bands.classify(envelope.status_code) != StatusBand::Success {
            return Ok(self.outcome(
                envelope.status_code,
                envelope.status_message,
                None,
                task_id,
            ));
        }

        let task = envelope.task_for(task_id).cloned().ok_or_else(|| {
            PollError::MalformedResponse(format!("no tasks in response for {}", task_id))
        })?;

        Ok(self.outcome(task.status_code, task.status_message.clone(), Some(task), task_id))
    }

    fn outcome(
        &self,
        status_code: i64,
        status_message: String,
        task: Option<TaskEnvelope>,
        task_id: &str,
    ) -> TaskResult {
        match self.bands.classify(status_code) {
            StatusBand::Success => match task {
                Some(task) if task.has_result() => TaskResult::Ready(TaskPayload {
                    task_id: task.id.unwrap_or_else(|| task_id.to_string()),
                    result: task.result.unwrap_or_default(),
                    extra: task.extra,
                }),
                _ => TaskResult::Pending,
            },
            StatusBand::Pending => TaskResult::Pending,
            StatusBand::NotFound => TaskResult::NotFound,
            StatusBand::Other(status_code) => TaskResult::Failed {
                status_code,
                status_message,
            },
        }
    }

    fn settled(&self) -> MutexGuard<'_, LruCache<String, TaskResult>> {
        // Entries are inserted whole, so a poisoned map is still consistent
        self.settled.lock().unwrap_or_else(|poisoned| {
            warn!("settled task memory was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    fn settled_result(&self, task_id: &str) -> Option<TaskResult> {
        self.settled().get(task_id).cloned()
    }

    fn remember(&self, task_id: &str, result: &TaskResult) {
        let mut settled = self.settled();
        if !settled.contains(task_id) {
            if let Some((evicted, _)) = settled.push(task_id.to_string(), result.clone()) {
                debug!(task_id = %evicted, "evicted settled task");
            }
        }
    }
}

/// `{prefix}/{task_id}` without doubled slashes
pub fn result_path(prefix: &str, task_id: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), task_id)
}

fn cancelled(task_id: &str, attempts: u32) -> PollError {
    info!(task_id, attempts, "polling cancelled");
    PollError::Cancelled {
        task_id: task_id.to_string(),
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    fn envelope(task_code: i64, result: Value) -> RawResponse {
        RawResponse::new(
            200,
            json!({
                "status_code": 20000,
                "status_message": "Ok.",
                "tasks": [{
                    "id": "task-1",
                    "status_code": task_code,
                    "status_message": "message",
                    "result": result,
                    "path": ["v3", "on_page", "summary"]
                }]
            }),
        )
    }

    fn ready() -> RawResponse {
        envelope(20000, json!([{ "crawl_progress": "finished" }]))
    }

    fn pending() -> RawResponse {
        envelope(20000, Value::Null)
    }

    /// Query function replaying `responses` and counting calls
    fn scripted(
        responses: Vec<RawResponse>,
    ) -> (
        Arc<Mutex<usize>>,
        impl FnMut(String) -> std::future::Ready<Result<RawResponse, ProviderError>>,
    ) {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut queue: VecDeque<RawResponse> = responses.into();
        let query = move |_id: String| {
            *counter.lock().unwrap() += 1;
            let next = queue.pop_front().unwrap_or_else(pending);
            std::future::ready(Ok(next))
        };
        (calls, query)
    }

    fn poller() -> TaskResultPoller {
        TaskResultPoller::new(StatusBands::default(), BackoffPolicy::default())
    }

    #[tokio::test]
    async fn test_single_poll_ready() {
        let poller = poller();
        let (_, query) = scripted(vec![ready()]);

        let result = poller.poll("task-1", query).await.unwrap();
        match result {
            TaskResult::Ready(payload) => {
                assert_eq!(payload.task_id, "task-1");
                assert_eq!(payload.result.len(), 1);
                assert_eq!(payload.extra["path"], json!(["v3", "on_page", "summary"]));
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_result_is_pending() {
        let poller = poller();
        let (_, query) = scripted(vec![envelope(20000, json!([]))]);
        assert_eq!(poller.poll("task-1", query).await.unwrap(), TaskResult::Pending);
    }

    #[tokio::test]
    async fn test_not_found_code() {
        let poller = poller();
        let (_, query) = scripted(vec![envelope(40400, Value::Null)]);
        assert_eq!(poller.poll("task-1", query).await.unwrap(), TaskResult::NotFound);
    }

    #[tokio::test]
    async fn test_other_code_is_failed() {
        let poller = poller();
        let (_, query) = scripted(vec![envelope(40501, Value::Null)]);
        assert_eq!(
            poller.poll("task-1", query).await.unwrap(),
            TaskResult::Failed {
                status_code: 40501,
                status_message: "message".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_failing_envelope_overrides_tasks() {
        let poller = poller();
        let response = RawResponse::new(
            200,
            json!({ "status_code": 40100, "status_message": "Authorization failed.", "tasks": null }),
        );
        let (_, query) = scripted(vec![response]);

        assert_eq!(
            poller.poll("task-1", query).await.unwrap(),
            TaskResult::Failed {
                status_code: 40100,
                status_message: "Authorization failed.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_configured_pending_code() {
        let bands = StatusBands {
            pending: vec![40602],
            ..StatusBands::default()
        };
        let poller = TaskResultPoller::new(bands, BackoffPolicy::default());
        let (_, query) = scripted(vec![envelope(40602, Value::Null)]);
        assert_eq!(poller.poll("task-1", query).await.unwrap(), TaskResult::Pending);
    }

    #[tokio::test]
    async fn test_http_error_is_transport_error() {
        let poller = poller();
        let (_, query) = scripted(vec![RawResponse::new(503, Value::Null)]);

        let result = poller.poll("task-1", query).await;
        assert!(matches!(
            result,
            Err(PollError::TransportError { status_code: Some(503), .. })
        ));
    }

    #[tokio::test]
    async fn test_envelope_without_tasks_is_malformed() {
        let poller = poller();
        let (_, query) = scripted(vec![RawResponse::new(200, json!({ "status_code": 20000, "tasks": [] }))]);
        assert!(matches!(
            poller.poll("task-1", query).await,
            Err(PollError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_settled_result_does_not_flap() {
        let poller = poller();
        let (calls, mut query) = scripted(vec![ready(), pending()]);

        let first = poller.poll("task-1", &mut query).await.unwrap();
        let second = poller.poll("task-1", &mut query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_terminal_retries_pending() {
        let poller = poller();
        let (calls, query) = scripted(vec![pending(), pending(), pending(), ready()]);

        let payload = poller
            .poll_until_terminal("task-1", query, Cancellation::none())
            .await
            .unwrap();

        assert_eq!(payload.task_id, "task-1");
        assert_eq!(*calls.lock().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_terminal_not_found_stops_immediately() {
        let poller = poller();
        let (calls, query) = scripted(vec![envelope(40400, Value::Null), ready()]);

        let result = poller
            .poll_until_terminal("task-1", query, Cancellation::none())
            .await;

        assert!(matches!(result, Err(PollError::NotFound { .. })));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_terminal_times_out() {
        let policy = BackoffPolicy {
            max_elapsed_secs: 60,
            ..BackoffPolicy::default()
        };
        let poller = TaskResultPoller::new(StatusBands::default(), policy.clone());
        let (calls, query) = scripted(Vec::new());
        let started = Instant::now();

        let result = poller
            .poll_until_terminal("task-1", query, Cancellation::none())
            .await;

        match result {
            Err(PollError::Timeout { attempts, elapsed, .. }) => {
                assert_eq!(attempts, policy.max_queries());
                assert!(elapsed <= Duration::from_secs(60));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(*calls.lock().unwrap() as u32, policy.max_queries());
        assert!(started.elapsed() <= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_terminal_deadline_cancels() {
        let poller = poller();
        let (calls, query) = scripted(Vec::new());
        let cancellation = Cancellation::none().with_deadline(Instant::now() + Duration::from_secs(4));

        let result = poller
            .poll_until_terminal("task-1", query, cancellation)
            .await;

        // Queries at t=0 and t=2s; the 3s delay after that crosses the deadline
        assert!(matches!(result, Err(PollError::Cancelled { attempts: 2, .. })));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_settled_memory_is_bounded() {
        let policy = BackoffPolicy {
            settled_capacity: 2,
            ..BackoffPolicy::default()
        };
        let poller = TaskResultPoller::new(StatusBands::default(), policy);

        for id in ["a", "b", "c"] {
            let (_, query) = scripted(vec![ready()]);
            poller.poll(id, query).await.unwrap();
        }
        assert_eq!(poller.settled_len(), 2);

        // "a" was evicted, so it is queried again
        let (calls, query) = scripted(vec![pending()]);
        assert_eq!(poller.poll("a", query).await.unwrap(), TaskResult::Pending);
        assert_eq!(*calls.lock().unwrap(), 1);

        let (calls, query) = scripted(Vec::new());
        assert!(matches!(poller.poll("c", query).await.unwrap(), TaskResult::Ready(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_poisoned_memory_still_prevents_flapping() {
        let poller = poller();
        let (_, query) = scripted(vec![ready()]);
        poller.poll("task-1", query).await.unwrap();

        let joined = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = poller.settled.lock().unwrap();
                    panic!("panic while holding the settled memory");
                })
                .join()
        });
        assert!(joined.is_err());
        assert!(poller.settled.is_poisoned());

        let (calls, query) = scripted(vec![pending()]);
        assert!(matches!(poller.poll("task-1", query).await.unwrap(), TaskResult::Ready(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_skips_settled_memory() {
        let poller = poller();
        let (_, query) = scripted(vec![ready()]);
        poller.poll("task-1", query).await.unwrap();

        let result = poller
            .fetch("task-1", std::future::ready(Ok(pending())))
            .await
            .unwrap();
        assert_eq!(result, TaskResult::Pending);
        assert_eq!(poller.settled_len(), 1);
    }

    #[test]
    fn test_result_path() {
        assert_eq!(result_path("on_page/summary", "abc"), "on_page/summary/abc");
        assert_eq!(result_path("on_page/summary/", "abc"), "on_page/summary/abc");
    }
}
