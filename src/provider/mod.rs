//! Remote provider boundary
//!
//! The core talks to the analysis provider only through [`RemoteProvider`]:
//! one POST-shaped and one GET-shaped round trip, each returning an HTTP
//! status and a JSON body. [`HttpProvider`] is the reqwest implementation;
//! tests substitute scripted fakes.

pub mod client;
pub mod types;

use crate::errors::ProviderError;
use async_trait::async_trait;
use serde_json::Value;

// Re-export commonly used types
pub use client::{HttpProvider, DEFAULT_BASE_URL};
pub use types::{ProviderResponse, RawResponse, StatusBand, StatusBands, TaskEnvelope};

/// A single-call client for the remote analysis provider
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Create a job at `path`
    async fn post_job(&self, path: &str, body: Value) -> Result<RawResponse, ProviderError>;

    /// Query `path`; the body is usually absent
    async fn get_job(&self, path: &str, body: Option<Value>) -> Result<RawResponse, ProviderError>;
}
