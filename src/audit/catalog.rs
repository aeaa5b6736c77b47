//! Analysis catalog
//!
//! Which provider endpoints each analysis uses and how its request body is
//! shaped. Every body is a one-element array, as the provider batches tasks.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Default crawl budget for site audits
pub const DEFAULT_MAX_CRAWL_PAGES: u32 = 50;

/// Endpoint listing tasks whose results are ready
pub const TASKS_READY_PATH: &str = "on_page/tasks_ready";

/// Kinds of analysis the provider runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Single-page metadata, canonical, hreflang and schema
    InstantPages,

    /// Site crawl: graph and crawlability
    SiteAudit,

    /// Entities and topical flow of one page
    ContentAnalysis,

    /// Entity coverage compared against competitors
    EntityGap,
}

impl AnalysisKind {
    /// Endpoint that creates the task
    pub fn submit_path(&self) -> &'static str {
        match self {
            AnalysisKind::InstantPages => "on_page/instant_pages",
            AnalysisKind::SiteAudit => "on_page/task_post",
            AnalysisKind::ContentAnalysis => "content_analysis/analyze",
            AnalysisKind::EntityGap => "content_analysis/competitors",
        }
    }

    /// Endpoint prefix the task id is appended to when fetching results
    pub fn result_path(&self) -> &'static str {
        match self {
            AnalysisKind::SiteAudit => "on_page/summary",
            other => other.submit_path(),
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisKind::InstantPages => "instant-pages",
            AnalysisKind::SiteAudit => "site-audit",
            AnalysisKind::ContentAnalysis => "content-analysis",
            AnalysisKind::EntityGap => "entity-gap",
        };
        f.write_str(name)
    }
}

/// One analysis to submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,

    /// Page URL or domain, depending on the kind
    pub target: String,

    /// Only used by entity-gap analyses
    #[serde(default)]
    pub competitors: Vec<String>,

    /// Only used by site audits
    #[serde(default)]
    pub max_crawl_pages: Option<u32>,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            competitors: Vec::new(),
            max_crawl_pages: None,
        }
    }

    pub fn with_competitors(mut self, competitors: Vec<String>) -> Self {
        self.competitors = competitors;
        self
    }

    pub fn with_max_crawl_pages(mut self, pages: u32) -> Self {
        self.max_crawl_pages = Some(pages);
        self
    }

    /// Provider request body
    pub fn payload(&self) -> Value {
        match self.kind {
            AnalysisKind::InstantPages => json!([{ "target": self.target }]),
            AnalysisKind::SiteAudit => json!([{
                "target": self.target,
                "max_crawl_pages": self.max_crawl_pages.unwrap_or(DEFAULT_MAX_CRAWL_PAGES),
            }]),
            AnalysisKind::ContentAnalysis => json!([{ "url": self.target }]),
            AnalysisKind::EntityGap => json!([{
                "target": self.target,
                "targets_compare": self.competitors,
            }]),
        }
    }
}

/// Per-page and per-link listings of a finished site audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DetailKind {
    /// Crawled pages with their on-page checks
    Pages,

    /// Links found during the crawl
    Links,
}

impl DetailKind {
    pub fn path(&self) -> &'static str {
        match self {
            DetailKind::Pages => "on_page/pages",
            DetailKind::Links => "on_page/links",
        }
    }
}

impl fmt::Display for DetailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailKind::Pages => f.write_str("pages"),
            DetailKind::Links => f.write_str("links"),
        }
    }
}

/// Filtered listing request against a site-audit task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailQuery {
    pub kind: DetailKind,
    pub task_id: String,

    /// Provider filter expression, passed through untouched
    #[serde(default)]
    pub filters: Option<Value>,

    /// Sort rules such as `"meta.title_length,desc"`
    #[serde(default)]
    pub order_by: Vec<String>,

    #[serde(default)]
    pub limit: Option<u32>,
}

impl DetailQuery {
    pub fn new(kind: DetailKind, task_id: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: task_id.into(),
            filters: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<String>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Provider request body; unset options are left out
    pub fn payload(&self) -> Value {
        let mut task = Map::new();
        task.insert("id".to_string(), json!(self.task_id));
        if let Some(filters) = &self.filters {
            task.insert("filters".to_string(), filters.clone());
        }
        if !self.order_by.is_empty() {
            task.insert("order_by".to_string(), json!(self.order_by));
        }
        if let Some(limit) = self.limit {
            task.insert("limit".to_string(), json!(limit));
        }
        Value::Array(vec![Value::Object(task)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(AnalysisKind::SiteAudit.submit_path(), "on_page/task_post");
        assert_eq!(AnalysisKind::SiteAudit.result_path(), "on_page/summary");
        assert_eq!(
            AnalysisKind::InstantPages.result_path(),
            AnalysisKind::InstantPages.submit_path()
        );
    }

    #[test]
    fn test_site_audit_payload_defaults_crawl_budget() {
        let payload = AnalysisRequest::new(AnalysisKind::SiteAudit, "example.com").payload();
        assert_eq!(
            payload,
            json!([{ "target": "example.com", "max_crawl_pages": DEFAULT_MAX_CRAWL_PAGES }])
        );

        let payload = AnalysisRequest::new(AnalysisKind::SiteAudit, "example.com")
            .with_max_crawl_pages(10)
            .payload();
        assert_eq!(payload[0]["max_crawl_pages"], json!(10));
    }

    #[test]
    fn test_entity_gap_payload() {
        let payload = AnalysisRequest::new(AnalysisKind::EntityGap, "example.com")
            .with_competitors(vec!["a.com".to_string(), "b.com".to_string()])
            .payload();
        assert_eq!(
            payload,
            json!([{ "target": "example.com", "targets_compare": ["a.com", "b.com"] }])
        );
    }

    #[test]
    fn test_detail_payload_omits_unset_options() {
        let query = DetailQuery::new(DetailKind::Pages, "07031739-1535-0216-0000-9a2c17c7f2a4");
        assert_eq!(
            query.payload(),
            json!([{ "id": "07031739-1535-0216-0000-9a2c17c7f2a4" }])
        );

        let query = DetailQuery::new(DetailKind::Links, "t1")
            .with_filters(json!(["dofollow", "=", true]))
            .with_order_by(vec!["page_from_rank,desc".to_string()])
            .with_limit(10);
        assert_eq!(
            query.payload(),
            json!([{
                "id": "t1",
                "filters": ["dofollow", "=", true],
                "order_by": ["page_from_rank,desc"],
                "limit": 10,
            }])
        );
        assert_eq!(query.kind.path(), "on_page/links");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(AnalysisKind::EntityGap.to_string(), "entity-gap");
    }
}
