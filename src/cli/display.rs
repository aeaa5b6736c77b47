//! Terminal rendering of handles, poll outcomes and score breakdowns
//!
//! Human output is colored; `--json` output goes through serde_json and is
//! always a single document on stdout.

use crate::audit::AnalysisKind;
use crate::scoring::{MetricRuleSet, ScoreBreakdown, Threshold, Tier};
use crate::task::{TaskHandle, TaskPayload, TaskResult};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use std::time::Duration;

/// Spinner shown while polling
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn tier_colored(tier: Tier) -> ColoredString {
    let text = tier.to_string();
    match tier {
        Tier::Healthy => text.green().bold(),
        Tier::NeedsImprovement => text.yellow().bold(),
        Tier::Critical => text.red().bold(),
    }
}

fn raw_colored(raw: u8) -> ColoredString {
    let text = format!("{:>3}", raw);
    match raw {
        100 => text.green(),
        0 => text.red(),
        _ => text.yellow(),
    }
}

pub fn print_handle(handle: &TaskHandle) {
    println!("{} {}", "Task submitted:".green().bold(), handle.id.bold());
    println!("  Submitted at: {}", handle.submitted_at.to_rfc3339());
    match handle.estimated_wait() {
        Some(wait) => println!("  Estimated wait: {:.0}s", wait.as_secs_f64()),
        None => println!("  Estimated wait: {}", "unknown".dimmed()),
    }
}

/// Suggested re-check command for a submitted task
pub fn recheck_hint(kind: AnalysisKind, handle: &TaskHandle) -> String {
    let command = format!("pageaudit poll {} {}", kind, handle.id);
    match handle.estimated_wait() {
        Some(wait) => format!("Re-check in ~{:.0}s with: {}", wait.as_secs_f64().ceil(), command),
        None => format!("Re-check with: {} (or add --wait)", command),
    }
}

/// JSON document for a single poll outcome
pub fn result_json(task_id: &str, result: &TaskResult) -> Value {
    match result {
        TaskResult::Ready(payload) => payload_json(payload),
        TaskResult::Pending => json!({ "task_id": task_id, "state": "pending" }),
        TaskResult::NotFound => json!({ "task_id": task_id, "state": "not_found" }),
        TaskResult::Failed {
            status_code,
            status_message,
        } => json!({
            "task_id": task_id,
            "state": "failed",
            "status_code": status_code,
            "status_message": status_message,
        }),
    }
}

pub fn payload_json(payload: &TaskPayload) -> Value {
    json!({
        "task_id": payload.task_id,
        "state": "ready",
        "result": payload.result,
    })
}

pub fn print_result(task_id: &str, result: &TaskResult) {
    match result {
        TaskResult::Ready(payload) => print_payload(payload),
        TaskResult::Pending => println!("{} {} is still running", "Pending:".yellow().bold(), task_id),
        TaskResult::NotFound => println!("{} {} is unknown to the provider", "Not found:".red().bold(), task_id),
        TaskResult::Failed {
            status_code,
            status_message,
        } => println!(
            "{} {} ({} {})",
            "Failed:".red().bold(),
            task_id,
            status_code,
            status_message
        ),
    }
}

pub fn print_payload(payload: &TaskPayload) {
    println!(
        "{} {} ({} result entries)",
        "Ready:".green().bold(),
        payload.task_id,
        payload.result.len()
    );
    match serde_json::to_string_pretty(&payload.result) {
        Ok(text) => println!("{}", text),
        Err(e) => println!("{}", format!("<unprintable result: {}>", e).dimmed()),
    }
}

pub fn print_breakdown(breakdown: &ScoreBreakdown) {
    println!("\n{} {}", "Page:".bold(), breakdown.subject_url);
    println!(
        "{} {:.2} / 100  {}",
        "Score:".bold(),
        breakdown.composite_score,
        tier_colored(breakdown.tier)
    );
    println!();

    for metric in &breakdown.per_metric {
        let measured = metric
            .measured_value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "missing".to_string());
        println!(
            "  {}  {:<28} {:<12} {}",
            raw_colored(metric.raw_score),
            metric.label,
            measured,
            format!("[{}]", metric.weight_class).dimmed()
        );
    }
    println!();
}

pub fn print_rules(rules: &MetricRuleSet) {
    let weights = rules.weights();
    println!(
        "{} high={} medium={} low={}",
        "Weights:".bold(),
        weights.high,
        weights.medium,
        weights.low
    );
    println!();

    for rule in rules.rules() {
        let threshold = match &rule.threshold {
            Threshold::Range {
                healthy_min,
                healthy_max,
            } => format!("{}..={}", healthy_min, healthy_max),
            Threshold::ExactMatch { expected } => format!("== {}", expected),
        };
        println!(
            "  {:<24} {:<28} {:<14} {}",
            rule.key.cyan(),
            rule.label,
            threshold,
            rule.weight_class.to_string().dimmed()
        );
    }
}

pub fn print_ready(ids: &[String]) {
    if ids.is_empty() {
        println!("{}", "No tasks ready".dimmed());
        return;
    }
    for id in ids {
        println!("{}", id);
    }
}
