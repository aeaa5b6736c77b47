//! Metric rules and rule sets
//!
//! A rule set is loaded once (from TOML or the built-in on-page benchmark)
//! and never mutated. Rule order is the order of `[[metrics]]` entries and
//! determines the order of per-metric score breakdowns.

use crate::errors::ScoringError;
use crate::scoring::extract::{MetricSource, SourceMode};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Weight used when a rule names an unknown weight class
pub const FALLBACK_WEIGHT: f64 = 0.1;

/// A measured (or expected) metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Bool(value) => write!(f, "{}", value),
            MetricValue::Number(value) => write!(f, "{}", value),
            MetricValue::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Bool(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

/// Coarse importance tier of a metric
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeightClass {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl From<String> for WeightClass {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => WeightClass::High,
            "medium" => WeightClass::Medium,
            "low" => WeightClass::Low,
            _ => WeightClass::Unrecognized(value),
        }
    }
}

impl From<WeightClass> for String {
    fn from(value: WeightClass) -> Self {
        value.to_string()
    }
}

impl fmt::Display for WeightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightClass::High => f.write_str("high"),
            WeightClass::Medium => f.write_str("medium"),
            WeightClass::Low => f.write_str("low"),
            WeightClass::Unrecognized(name) => f.write_str(name),
        }
    }
}

/// Numeric weight per weight class; values need not sum to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.2,
            low: 0.1,
        }
    }
}

impl WeightTable {
    pub fn weight_for(&self, class: &WeightClass) -> f64 {
        match class {
            WeightClass::High => self.high,
            WeightClass::Medium => self.medium,
            WeightClass::Low => self.low,
            WeightClass::Unrecognized(name) => {
                warn!(weight_class = %name, fallback = FALLBACK_WEIGHT, "unrecognized weight class");
                FALLBACK_WEIGHT
            }
        }
    }

    fn validate(&self) -> Result<(), ScoringError> {
        for (name, weight) in [("high", self.high), ("medium", self.medium), ("low", self.low)] {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(ScoringError::InvalidRule {
                    key: format!("weights.{}", name),
                    reason: format!("weight must be positive, got {}", weight),
                });
            }
        }
        Ok(())
    }
}

/// How a measured value is judged
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    /// Healthy inside `[min, max]`, near miss within 30% outside it
    Range { healthy_min: f64, healthy_max: f64 },

    /// Healthy only when equal to the expected value
    ExactMatch { expected: MetricValue },
}

/// One evaluated dimension
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRule {
    pub key: String,
    pub label: String,
    pub threshold: Threshold,
    pub weight_class: WeightClass,
    pub source: Option<MetricSource>,
}

impl MetricRule {
    pub fn range(key: &str, label: &str, healthy_min: f64, healthy_max: f64, weight_class: WeightClass) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            threshold: Threshold::Range {
                healthy_min,
                healthy_max,
            },
            weight_class,
            source: None,
        }
    }

    pub fn exact(key: &str, label: &str, expected: impl Into<MetricValue>, weight_class: WeightClass) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            threshold: Threshold::ExactMatch {
                expected: expected.into(),
            },
            weight_class,
            source: None,
        }
    }

    /// Attach a payload pointer the metric is extracted from
    pub fn with_source(mut self, pointer: &str, mode: SourceMode) -> Self {
        self.source = Some(MetricSource {
            pointer: pointer.to_string(),
            mode,
        });
        self
    }
}

/// Ordered, immutable set of metric rules plus their weight table
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRuleSet {
    weights: WeightTable,
    rules: Vec<MetricRule>,
}

/// TOML shape of a rule set file
#[derive(Debug, Serialize, Deserialize)]
struct RuleSetFile {
    #[serde(default)]
    weights: WeightTable,
    #[serde(default)]
    metrics: Vec<RuleEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleEntry {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    healthy_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    healthy_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected: Option<MetricValue>,
    weight: WeightClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<MetricSource>,
}

impl RuleEntry {
    fn into_rule(self) -> Result<MetricRule, ScoringError> {
        let invalid = |reason: &str| ScoringError::InvalidRule {
            key: self.key.clone(),
            reason: reason.to_string(),
        };

        let threshold = match (self.healthy_min, self.healthy_max, &self.expected) {
            (Some(healthy_min), Some(healthy_max), None) => {
                if !(healthy_min.is_finite() && healthy_max.is_finite()) {
                    return Err(invalid("healthy bounds must be finite"));
                }
                if healthy_min > healthy_max {
                    return Err(invalid("healthy_min is greater than healthy_max"));
                }
                Threshold::Range {
                    healthy_min,
                    healthy_max,
                }
            }
            (None, None, Some(expected)) => Threshold::ExactMatch {
                expected: expected.clone(),
            },
            (_, _, Some(_)) => return Err(invalid("expected cannot be combined with healthy bounds")),
            _ => return Err(invalid("needs both healthy_min and healthy_max, or expected")),
        };

        Ok(MetricRule {
            label: self.label.unwrap_or_else(|| self.key.clone()),
            key: self.key,
            threshold,
            weight_class: self.weight,
            source: self.source,
        })
    }

    fn from_rule(rule: &MetricRule) -> Self {
        let (healthy_min, healthy_max, expected) = match &rule.threshold {
            Threshold::Range {
                healthy_min,
                healthy_max,
            } => (Some(*healthy_min), Some(*healthy_max), None),
            Threshold::ExactMatch { expected } => (None, None, Some(expected.clone())),
        };

        Self {
            key: rule.key.clone(),
            label: Some(rule.label.clone()),
            healthy_min,
            healthy_max,
            expected,
            weight: rule.weight_class.clone(),
            source: rule.source.clone(),
        }
    }
}

impl MetricRuleSet {
    /// Build a rule set, rejecting duplicate keys and non-positive weights
    pub fn new(weights: WeightTable, rules: Vec<MetricRule>) -> Result<Self, ScoringError> {
        weights.validate()?;

        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.key.as_str()) {
                return Err(ScoringError::InvalidRule {
                    key: rule.key.clone(),
                    reason: "duplicate metric key".to_string(),
                });
            }
        }

        Ok(Self { weights, rules })
    }

    /// Parse a rule set from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ScoringError> {
        let file: RuleSetFile = toml::from_str(text).map_err(|e| ScoringError::InvalidRule {
            key: "<file>".to_string(),
            reason: e.to_string(),
        })?;

        let rules = file
            .metrics
            .into_iter()
            .map(RuleEntry::into_rule)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(file.weights, rules)
    }

    /// Load a rule set file
    pub fn load(path: &Path) -> crate::errors::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml(&text)?)
    }

    fn to_file(&self) -> RuleSetFile {
        RuleSetFile {
            weights: self.weights.clone(),
            metrics: self.rules.iter().map(RuleEntry::from_rule).collect(),
        }
    }

    /// Render back to TOML
    pub fn to_toml(&self) -> crate::errors::Result<String> {
        toml::to_string_pretty(&self.to_file())
            .map_err(|e| crate::errors::AuditError::Config(format!("Failed to serialize rules: {}", e)))
    }

    /// The on-page benchmark: five page-quality metrics with sources in the
    /// provider's instant-pages result shape
    pub fn on_page_benchmark() -> Self {
        let rules = vec![
            MetricRule::range("title_length", "Title length", 30.0, 60.0, WeightClass::Low)
                .with_source("/items/0/meta/title_length", SourceMode::Value),
            MetricRule::range(
                "meta_description_length",
                "Meta description length",
                70.0,
                160.0,
                WeightClass::Low,
            )
            .with_source("/items/0/meta/description_length", SourceMode::Value),
            MetricRule::exact("h1_present", "H1 tag present", true, WeightClass::Medium)
                .with_source("/items/0/meta/htags/h1", SourceMode::Present),
            MetricRule::range(
                "content_word_count",
                "Content word count",
                300.0,
                1500.0,
                WeightClass::High,
            )
            .with_source("/items/0/meta/content/plain_text_word_count", SourceMode::Value),
            MetricRule::range("internal_links", "Internal links count", 3.0, 15.0, WeightClass::Medium)
                .with_source("/items/0/meta/internal_links_count", SourceMode::Value),
        ];

        Self {
            weights: WeightTable::default(),
            rules,
        }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    pub fn rules(&self) -> &[MetricRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Serializes in the rule-set file shape, so JSON and TOML agree
impl Serialize for MetricRuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_file().serialize(serializer)
    }
}
