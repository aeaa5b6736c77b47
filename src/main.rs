//! pageaudit - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use pageaudit::{
    audit::{AnalysisKind, AnalysisRequest, AuditOrchestrator, DetailQuery},
    cli::{display, Args, Commands, Verbosity},
    config::Config,
    scoring::MeasuredValues,
    task::{Cancellation, TaskHandle},
    telemetry,
};
use std::path::Path;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let verbosity = args.verbosity();
    telemetry::init(verbosity);

    let mut config = Config::load(args.config.clone())?;
    config.apply_env_overrides();
    config.validate()?;

    let orchestrator = AuditOrchestrator::from_config(&config)?;

    match &args.command {
        Commands::Submit {
            kind,
            target,
            competitors,
            max_pages,
        } => {
            let mut request = AnalysisRequest::new(*kind, target.as_str())
                .with_competitors(competitors.clone());
            if let Some(pages) = max_pages {
                request = request.with_max_crawl_pages(*pages);
            }
            if !competitors.is_empty() && *kind != AnalysisKind::EntityGap {
                warn!(kind = %kind, "--competitor is only used by entity-gap analyses");
            }

            let handle = orchestrator.start(&request).await?;
            if args.json {
                print_json(&handle)?;
            } else {
                display::print_handle(&handle);
                println!("{}", display::recheck_hint(*kind, &handle));
            }
        }
        Commands::Poll { kind, task_id, wait } => {
            if *wait {
                wait_for(&orchestrator, &args, verbosity, *kind, task_id).await?;
            } else {
                let result = orchestrator.check(*kind, task_id).await?;
                if args.json {
                    print_json(&display::result_json(task_id, &result))?;
                } else {
                    display::print_result(task_id, &result);
                }
            }
        }
        Commands::Detail {
            kind,
            task_id,
            filters,
            order_by,
            limit,
        } => {
            let mut query = DetailQuery::new(*kind, task_id.as_str()).with_order_by(order_by.clone());
            if let Some(text) = filters {
                let filters = serde_json::from_str(text).context("--filters is not valid JSON")?;
                query = query.with_filters(filters);
            }
            if let Some(limit) = limit {
                query = query.with_limit(*limit);
            }

            let result = orchestrator.fetch_detail(&query).await?;
            if args.json {
                print_json(&display::result_json(task_id, &result))?;
            } else {
                display::print_result(task_id, &result);
            }
        }
        Commands::Audit { url } => {
            let cancellation = cancel_on_ctrl_c();
            let pb = verbosity
                .show_progress()
                .then(|| display::spinner(&format!("Auditing {}", url)));

            let outcome = orchestrator.audit_page(url, cancellation).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            let breakdown = outcome?;
            if args.json {
                print_json(&breakdown)?;
            } else {
                display::print_breakdown(&breakdown);
            }
        }
        Commands::Score { url, measured } => {
            let values = read_measured(measured)?;
            let breakdown = orchestrator.score_measurements(url, &values)?;
            if args.json {
                print_json(&breakdown)?;
            } else {
                display::print_breakdown(&breakdown);
            }
        }
        Commands::Rules => {
            if args.json {
                print_json(orchestrator.rules())?;
            } else {
                display::print_rules(orchestrator.rules());
            }
        }
        Commands::Ready => {
            let ids = orchestrator.tasks_ready().await?;
            if args.json {
                print_json(&ids)?;
            } else {
                display::print_ready(&ids);
            }
        }
    }

    Ok(())
}

async fn wait_for(
    orchestrator: &AuditOrchestrator,
    args: &Args,
    verbosity: Verbosity,
    kind: AnalysisKind,
    task_id: &str,
) -> Result<()> {
    let handle = TaskHandle::new(task_id, None);
    let cancellation = cancel_on_ctrl_c();
    let pb = verbosity
        .show_progress()
        .then(|| display::spinner(&format!("Waiting for {} task {}", kind, task_id)));

    let outcome = orchestrator.wait(kind, &handle, cancellation).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let payload = outcome?;
    if args.json {
        print_json(&display::payload_json(&payload))?;
    } else {
        display::print_payload(&payload);
    }
    Ok(())
}

/// Cancellation that fires on the first Ctrl-C
fn cancel_on_ctrl_c() -> Cancellation {
    let (handle, cancellation) = Cancellation::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            handle.cancel();
        }
    });
    cancellation
}

fn read_measured(path: &Path) -> Result<MeasuredValues> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let values: MeasuredValues = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON object of metric values", path.display()))?;
    Ok(values)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
