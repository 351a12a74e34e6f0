//! Bulk account runner
//!
//! Single-binary batch tool that:
//! 1. Loads the TOML config and the JSON account table
//! 2. Selects accounts (range or exact list, optional shuffle)
//! 3. Runs the selected tasks, or a mutual subscription, over a bounded worker pool
//! 4. Prints the statistics table and writes optional metrics/report files
//!
//! Ctrl-C stops dispatching; in-flight accounts stop at their next retry
//! boundary or pause.

mod accounts;
mod config;
mod error;
mod input;
mod metrics;
mod report;

use std::sync::Arc;

use account_client::DryRunFactory;
use account_store::{AccountStore, JsonAccountStore};
use anyhow::{Context, Result};
use common::Account;
use orchestrator::{MutualSubscription, RunContext, RunSummary, Scheduler, TaskSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Mode};

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, level from LOG_LEVEL then RUST_LOG
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting bulk-runner");

    // Installed before the first counter is touched
    let prometheus =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        mode = %config.tasks.mode,
        threads = config.settings.threads,
        retries = config.settings.retries,
        accounts_file = %config.input.accounts_file.display(),
        "configuration loaded"
    );

    let store = Arc::new(
        JsonAccountStore::open(config.input.accounts_file.clone())
            .await
            .with_context(|| {
                format!(
                    "failed to open account table {}",
                    config.input.accounts_file.display()
                )
            })?,
    );
    let all = store.load().await.context("failed to read account table")?;
    let accounts = accounts::select(all, &config.settings);
    if accounts.is_empty() {
        warn!("no accounts selected, nothing to do");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, finishing in-flight accounts");
                cancel.cancel();
            }
        });
    }

    let ctx = RunContext::new(
        config.run_settings(),
        Arc::new(DryRunFactory::new()),
        store.clone(),
    )
    .with_cancel(cancel);

    let run_id = uuid::Uuid::new_v4();

    let summary = execute(&config, ctx, accounts)
        .instrument(info_span!("run", %run_id, mode = %config.tasks.mode))
        .await?;

    println!("{}", report::render(&summary));

    metrics::record_summary(&summary.stats, &config.tasks.mode.to_string());
    if let Some(path) = &config.output.metrics_path {
        metrics::write_snapshot(&prometheus, path)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "metrics written");
    }
    if let Some(path) = &config.output.report_path {
        report::write_json(&summary, path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    info!(%run_id, cancelled = summary.cancelled, "bulk-runner finished");
    Ok(())
}

async fn execute(config: &Config, ctx: RunContext, accounts: Vec<Account>) -> Result<RunSummary> {
    let summary = match config.tasks.mode {
        Mode::Tasks => {
            let tasks = config.selected_tasks()?;
            let input = input::build_task_input(&config.input)?;
            Scheduler::new(ctx, TaskSet::new(tasks, input))
                .run(accounts)
                .await?
        }
        Mode::MutualSubscription => {
            MutualSubscription::new(ctx, config.mutual_settings())
                .run(accounts)
                .await?
        }
    };
    Ok(summary)
}
