//! Page health scoring
//!
//! - `rules`: metric rules, weight table, rule-set loading
//! - `extract`: reading measured values out of task payloads
//! - `engine`: raw scores, weighted composite, tiers

pub mod engine;
pub mod extract;
pub mod rules;

// Re-export commonly used types
pub use engine::{raw_score, MetricScore, ScoreBreakdown, ScoringEngine, Tier};
pub use extract::{MeasuredValues, MetricSource, SourceMode};
pub use rules::{
    MetricRule, MetricRuleSet, MetricValue, Threshold, WeightClass, WeightTable, FALLBACK_WEIGHT,
};
