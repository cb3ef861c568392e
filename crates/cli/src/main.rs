//! Argus CLI
//!
//! Single-run entry point: evaluates a catalog snapshot against the
//! governance rules via the reasoning pipeline and prints the
//! consolidated report. Credentials and `.env` are loaded once here and
//! passed into the adapter as an explicit config object.

use anyhow::Context;
use argus_core::catalog::{Catalog, LookupOutcome};
use argus_core::models::{ReasoningConfig, ReasoningProvider};
use argus_core::pipeline::Orchestrator;
use argus_core::reasoning::{cancel_pair, ReasoningAdapter};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Argus - Architecture Governance Pipeline")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Run the governance pipeline and print the consolidated report (default)
    Run {
        /// Application name to evaluate, or "all"
        #[arg(default_value = "all")]
        target: String,
        /// Path to a catalog snapshot (JSON array of records)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Reasoning provider: openai, openrouter, local
        #[arg(long)]
        provider: Option<String>,
        /// Model name override
        #[arg(long)]
        model: Option<String>,
        /// Base URL override for OpenAI-compatible endpoints
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Look up an application in the catalog
    Catalog {
        /// Application name, or "all"
        #[arg(default_value = "all")]
        name: String,
        /// Path to a catalog snapshot (JSON array of records)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<Catalog> {
    match path {
        Some(path) => Catalog::from_path(path),
        None => Ok(Catalog::builtin()),
    }
}

fn build_config(
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<ReasoningConfig> {
    let provider = match provider.as_deref() {
        None => ReasoningProvider::default(),
        Some("openai") => ReasoningProvider::OpenAi,
        Some("openrouter") => ReasoningProvider::OpenRouter,
        Some("local") | Some("ollama") => ReasoningProvider::Local,
        Some(other) => anyhow::bail!(
            "unknown provider '{}', expected openai, openrouter or local",
            other
        ),
    };
    let model = model.unwrap_or_else(|| provider.default_model().to_string());
    let mut config = ReasoningConfig::with_provider(provider, model);
    if let Some(url) = base_url {
        config = config.with_base_url(url);
    }
    Ok(config)
}

async fn run_pipeline(
    target: &str,
    catalog_path: Option<&PathBuf>,
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
) -> anyhow::Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let config = build_config(provider, model, base_url)?;
    tracing::info!(
        provider = config.provider.display_name(),
        model = %config.model,
        target = %target,
        "starting governance run"
    );

    let adapter =
        ReasoningAdapter::http(&config).context("failed to initialize reasoning adapter")?;

    // Ctrl-C aborts the run at the next suspension point.
    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, aborting run");
            handle.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(catalog, adapter).with_cancel(token);
    let summary = orchestrator.run(target).await;

    if summary.success {
        if let Some(report) = &summary.report {
            println!("{}", report.to_pretty_json());
        }
        Ok(())
    } else {
        if let Some(failure) = &summary.failure {
            eprintln!("Run aborted at stage '{}': {}", failure.stage, failure.reason);
            if let Some(raw) = &failure.raw {
                eprintln!("--- raw stage output ---");
                eprintln!("{}", raw);
            }
        }
        eprintln!(
            "{} artifact(s) accumulated before the failure",
            summary.artifacts.len()
        );
        std::process::exit(1);
    }
}

fn show_catalog(name: &str, catalog_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let catalog = load_catalog(catalog_path)?;
    match catalog.lookup(name) {
        LookupOutcome::All(records) => println!("{}", serde_json::to_string_pretty(&records)?),
        LookupOutcome::Match(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        LookupOutcome::NotFound {
            requested,
            available,
        } => {
            println!(
                "No application named '{}'. Available: {}",
                requested,
                available.join(", ")
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        None => run_pipeline("all", None, None, None, None).await,
        Some(CliCommand::Run {
            target,
            catalog,
            provider,
            model,
            base_url,
        }) => run_pipeline(&target, catalog.as_ref(), provider, model, base_url).await,
        Some(CliCommand::Catalog { name, catalog }) => show_catalog(&name, catalog.as_ref()),
    }
}
