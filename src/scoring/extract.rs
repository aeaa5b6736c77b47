//! Metric extraction from task payloads
//!
//! Each rule may point at a location inside the first result entry of a
//! ready task (a JSON pointer) and say how to read it.

use crate::scoring::rules::{MetricRuleSet, MetricValue};
use crate::task::TaskPayload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Measured values keyed by metric key
pub type MeasuredValues = BTreeMap<String, MetricValue>;

/// How a pointed-at JSON value becomes a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Scalar as-is
    #[default]
    Value,

    /// `true` when the value exists and is non-empty
    Present,

    /// Number of elements (arrays, objects) or characters (strings)
    Count,
}

/// Where a metric lives inside a result entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSource {
    pub pointer: String,

    #[serde(default)]
    pub mode: SourceMode,
}

impl MetricSource {
    /// Read this source out of `root`
    pub fn read(&self, root: &Value) -> Option<MetricValue> {
        let found = root.pointer(&self.pointer).filter(|value| !value.is_null());

        match self.mode {
            SourceMode::Value => found.and_then(scalar),
            SourceMode::Present => Some(MetricValue::Bool(found.map_or(false, is_non_empty))),
            SourceMode::Count => found.and_then(count).map(MetricValue::Number),
        }
    }
}

impl MetricRuleSet {
    /// Measure every sourced rule against the first result entry of `payload`
    pub fn extract(&self, payload: &TaskPayload) -> MeasuredValues {
        let mut measured = MeasuredValues::new();
        let Some(root) = payload.result.first() else {
            return measured;
        };

        for rule in self.rules() {
            let Some(source) = &rule.source else {
                continue;
            };
            match source.read(root) {
                Some(value) => {
                    measured.insert(rule.key.clone(), value);
                }
                None => debug!(metric = %rule.key, pointer = %source.pointer, "metric not present in payload"),
            }
        }

        measured
    }
}

fn scalar(value: &Value) -> Option<MetricValue> {
    match value {
        Value::Bool(flag) => Some(MetricValue::Bool(*flag)),
        Value::Number(number) => number.as_f64().map(MetricValue::Number),
        Value::String(text) => Some(MetricValue::Text(text.clone())),
        _ => None,
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        Value::Number(_) => true,
    }
}

fn count(value: &Value) -> Option<f64> {
    match value {
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(fields) => Some(fields.len() as f64),
        Value::String(text) => Some(text.chars().count() as f64),
        _ => None,
    }
}
