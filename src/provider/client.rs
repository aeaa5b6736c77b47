//! reqwest-backed provider client
//!
//! Sends JSON bodies with HTTP basic auth and hands back the raw status and
//! JSON body. Interpreting status codes is left to the task layer.

use crate::config::{Credentials, ProviderConfig};
use crate::errors::ProviderError;
use crate::provider::types::RawResponse;
use crate::provider::RemoteProvider;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default provider API root
pub const DEFAULT_BASE_URL: &str = "https://api.dataforseo.com/v3/";

/// HTTP client for the analysis provider
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl HttpProvider {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            credentials: config.credentials(),
        })
    }

    /// Join the API root and a relative endpoint path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.login, Some(&credentials.password))
            }
            None => request,
        }
    }

    async fn read(response: Response) -> Result<RawResponse, ProviderError> {
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                // Error pages are often HTML; the status alone carries the failure
                Err(_) if !status.is_success() => Value::Null,
                Err(e) => return Err(ProviderError::Body(e.to_string())),
            }
        };

        Ok(RawResponse::new(status.as_u16(), body))
    }
}

#[async_trait]
impl RemoteProvider for HttpProvider {
    async fn post_job(&self, path: &str, body: Value) -> Result<RawResponse, ProviderError> {
        let url = self.url(path);
        debug!(%url, "POST job");

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        Self::read(response).await
    }

    async fn get_job(&self, path: &str, body: Option<Value>) -> Result<RawResponse, ProviderError> {
        let url = self.url(path);
        debug!(%url, "GET job");

        let mut request = self.authorize(self.client.get(&url));
        if let Some(body) = body {
            request = request.json(&body);
        }

        Self::read(request.send().await?).await
    }
}
