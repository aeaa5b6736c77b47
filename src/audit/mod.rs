//! End-to-end audit flows
//!
//! `catalog` names the provider analyses, their endpoints and the listing
//! queries over finished crawls;
//! `orchestrator` runs them.

pub mod catalog;
pub mod orchestrator;

// Re-export commonly used types
pub use catalog::{
    AnalysisKind, AnalysisRequest, DetailKind, DetailQuery, DEFAULT_MAX_CRAWL_PAGES, TASKS_READY_PATH,
};
pub use orchestrator::AuditOrchestrator;
