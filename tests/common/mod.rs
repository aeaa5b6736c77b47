//! Shared fixtures for integration tests
//!
//! `ScriptedProvider` answers provider calls from queues of canned
//! responses and records every call with the (tokio) time it was made.

#![allow(dead_code)]

use async_trait::async_trait;
use pageaudit::config::Config;
use pageaudit::errors::ProviderError;
use pageaudit::provider::{RawResponse, RemoteProvider};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// One recorded provider call
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
    pub at: Instant,
}

/// Provider double replaying scripted responses
#[derive(Default)]
pub struct ScriptedProvider {
    posts: Mutex<VecDeque<RawResponse>>,
    gets: Mutex<VecDeque<RawResponse>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_post(self, response: RawResponse) -> Self {
        self.posts.lock().unwrap().push_back(response);
        self
    }

    pub fn on_get(self, response: RawResponse) -> Self {
        self.gets.lock().unwrap().push_back(response);
        self
    }

    pub fn on_get_repeated(self, response: RawResponse, times: usize) -> Self {
        {
            let mut gets = self.gets.lock().unwrap();
            for _ in 0..times {
                gets.push_back(response.clone());
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<Value>) {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl RemoteProvider for ScriptedProvider {
    async fn post_job(&self, path: &str, body: Value) -> Result<RawResponse, ProviderError> {
        self.record("POST", path, Some(body));
        let next = self.posts.lock().unwrap().pop_front();
        next.ok_or_else(|| ProviderError::Body(format!("unscripted POST {}", path)))
    }

    async fn get_job(&self, path: &str, body: Option<Value>) -> Result<RawResponse, ProviderError> {
        self.record("GET", path, body);
        let next = self.gets.lock().unwrap().pop_front();
        next.ok_or_else(|| ProviderError::Body(format!("unscripted GET {}", path)))
    }
}

/// Config with credentials and the default polling policy
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.provider.login = Some("login".to_string());
    config.provider.password = Some("secret".to_string());
    config
}

fn envelope(task_id: &str, status_code: i64, status_message: &str, result: Value) -> RawResponse {
    RawResponse::new(
        200,
        json!({
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{
                "id": task_id,
                "status_code": status_code,
                "status_message": status_message,
                "result": result
            }]
        }),
    )
}

pub fn created(task_id: &str) -> RawResponse {
    envelope(task_id, 20100, "Task Created.", Value::Null)
}

pub fn pending(task_id: &str) -> RawResponse {
    envelope(task_id, 20000, "Ok.", Value::Null)
}

pub fn ready(task_id: &str, result: Value) -> RawResponse {
    envelope(task_id, 20000, "Ok.", json!([result]))
}

pub fn not_found(task_id: &str) -> RawResponse {
    envelope(task_id, 40400, "Not Found.", Value::Null)
}

/// Instant-pages result for a page that meets every benchmark rule
pub fn healthy_page() -> Value {
    json!({
        "crawl_progress": "finished",
        "items_count": 1,
        "items": [{
            "url": "https://example.com/",
            "meta": {
                "title_length": 45,
                "description_length": 140,
                "htags": { "h1": ["Example"] },
                "content": { "plain_text_word_count": 800 },
                "internal_links_count": 10
            }
        }]
    })
}
