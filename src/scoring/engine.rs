//! Weighted health scoring
//!
//! For every rule, in rule-set order:
//! - Exact match: 100 when the measured value equals the expected one, else 0
//! - Range: 100 inside `[min, max]`, 0 below `min * 0.7` or above `max * 1.3`,
//!   50 in between
//!
//! The composite is the weight-normalized mean of the raw scores, on a
//! 0–100 scale rounded to two decimals. Pure and deterministic.

use crate::errors::ScoringError;
use crate::scoring::extract::MeasuredValues;
use crate::scoring::rules::{MetricRule, MetricRuleSet, MetricValue, Threshold, WeightClass};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Lower edge of the near-miss band, as a fraction of `healthy_min`
pub const NEAR_MISS_LOW: f64 = 0.7;

/// Upper edge of the near-miss band, as a multiple of `healthy_max`
pub const NEAR_MISS_HIGH: f64 = 1.3;

/// Human-readable banding of a composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Healthy,
    NeedsImprovement,
    Critical,
}

impl Tier {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Tier::Healthy
        } else if score >= 60.0 {
            Tier::NeedsImprovement
        } else {
            Tier::Critical
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Healthy => f.write_str("Healthy"),
            Tier::NeedsImprovement => f.write_str("Needs improvement"),
            Tier::Critical => f.write_str("Critical"),
        }
    }
}

/// Score of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub key: String,
    pub label: String,
    pub measured_value: Option<MetricValue>,
    pub raw_score: u8,
    pub weight_class: WeightClass,
}

/// Output of the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub subject_url: String,
    pub composite_score: f64,
    pub tier: Tier,
    pub per_metric: Vec<MetricScore>,
}

/// Combines measured values into a weighted composite score
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        subject_url: &str,
        measured: &MeasuredValues,
        rules: &MetricRuleSet,
    ) -> Result<ScoreBreakdown, ScoringError> {
        let mut per_metric = Vec::with_capacity(rules.len());
        let mut contributions = Vec::with_capacity(rules.len());
        let mut weights = Vec::with_capacity(rules.len());

        for rule in rules.rules() {
            let measured_value = measured.get(&rule.key).cloned();
            let raw_score = match &measured_value {
                Some(value) => raw_score(rule, value),
                None => {
                    warn!(metric = %rule.key, "no measurement, scoring 0");
                    0
                }
            };

            let weight = rules.weights().weight_for(&rule.weight_class);
            weights.push(weight);
            contributions.push(f64::from(raw_score) / 100.0 * weight);

            per_metric.push(MetricScore {
                key: rule.key.clone(),
                label: rule.label.clone(),
                measured_value,
                raw_score,
                weight_class: rule.weight_class.clone(),
            });
        }

        // Summed in a canonical order so rule order cannot change the composite
        let total_weight = canonical_sum(weights);
        if total_weight <= 0.0 {
            return Err(ScoringError::EmptyRuleSet);
        }
        let weighted_score = canonical_sum(contributions);

        let composite_score = round2(weighted_score / total_weight * 100.0);

        Ok(ScoreBreakdown {
            subject_url: subject_url.to_string(),
            composite_score,
            tier: Tier::from_score(composite_score),
            per_metric,
        })
    }
}

/// Raw 0/50/100 score of one measured value against its rule
pub fn raw_score(rule: &MetricRule, value: &MetricValue) -> u8 {
    match &rule.threshold {
        Threshold::ExactMatch { expected } => {
            if value == expected {
                100
            } else {
                0
            }
        }
        Threshold::Range {
            healthy_min,
            healthy_max,
        } => {
            let Some(value) = value.as_number() else {
                warn!(metric = %rule.key, %value, "range metric measured with a non-number");
                return 0;
            };

            if *healthy_min <= value && value <= *healthy_max {
                100
            } else if value < healthy_min * NEAR_MISS_LOW || value > healthy_max * NEAR_MISS_HIGH {
                0
            } else {
                50
            }
        }
    }
}

fn canonical_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
