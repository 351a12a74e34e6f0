//! Bounded worker pool over accounts
//!
//! The dispatch loop acquires a semaphore permit, spawns the account unit with
//! the permit moved in, then sleeps `pause_between_accounts` before the next
//! acquisition. The permit drops when the unit finishes on any path, so at most
//! `threads` units run at once.

use std::future::Future;
use std::sync::Arc;

use common::Account;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::executor::{AccountReport, RunContext, process_account};
use crate::pacing::pause;
use crate::stats::{Outcome, Statistics, StatsSnapshot};
use crate::task::TaskSet;

/// Result of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stats: StatsSnapshot,
    /// Per-account reports sorted by dispatch index
    pub accounts: Vec<AccountReport>,
    pub cancelled: bool,
}

/// Runs the selected tasks over a list of accounts.
pub struct Scheduler {
    ctx: Arc<RunContext>,
    tasks: Arc<TaskSet>,
}

impl Scheduler {
    pub fn new(ctx: RunContext, tasks: TaskSet) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tasks: Arc::new(tasks),
        }
    }

    /// Dispatch every account and wait for all units.
    ///
    /// Settings and task input are validated first; a configuration fault is
    /// returned before any account is touched.
    pub async fn run(&self, accounts: Vec<Account>) -> Result<RunSummary> {
        let settings = &self.ctx.settings;
        settings.validate()?;
        self.tasks.validate(accounts.len())?;

        let total = accounts.len();
        let stats = Arc::new(Statistics::new(total));
        let labels: Vec<&str> = self.tasks.tasks.iter().map(|k| k.label()).collect();
        info!(total, threads = settings.threads, retries = settings.retries, tasks = ?labels, "starting task run");

        let units = dispatch(&self.ctx, accounts, |index, account| {
            let ctx = Arc::clone(&self.ctx);
            let tasks = Arc::clone(&self.tasks);
            let stats = Arc::clone(&stats);
            async move { process_account(&ctx, &tasks, &stats, index, account).await }
        })
        .await;

        let (mut reports, panicked) = join_all(units).await;
        for _ in 0..panicked {
            stats.record(Outcome::Failed);
        }
        reports.sort_by_key(|report| report.index);

        let summary = RunSummary {
            stats: stats.snapshot(),
            accounts: reports,
            cancelled: self.ctx.cancel.is_cancelled(),
        };
        info!(
            processed = summary.stats.processed,
            success = summary.stats.success,
            failed = summary.stats.failed,
            locked = summary.stats.locked,
            suspended = summary.stats.suspended,
            "task run finished"
        );
        Ok(summary)
    }
}

/// Spawn one unit per item, in order, under the worker-pool and pacing rules.
///
/// Stops dispatching once the run is cancelled; items not yet dispatched are
/// dropped. Returns the set of spawned units.
pub(crate) async fn dispatch<I, T, F, Fut>(
    ctx: &RunContext,
    items: Vec<I>,
    mut make_unit: F,
) -> JoinSet<T>
where
    F: FnMut(usize, I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(ctx.settings.threads));
    let mut units = JoinSet::new();

    let mut dispatched = 0usize;
    for (index, item) in items.into_iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let unit = make_unit(index, item);
        units.spawn(async move {
            let _permit = permit;
            unit.await
        });
        dispatched += 1;

        if dispatched < total && !pause(ctx.settings.pause_between_accounts, &ctx.cancel).await {
            break;
        }
    }
    if dispatched < total {
        warn!(dispatched, total, "run cancelled, remaining accounts not dispatched");
    }
    units
}

/// Wait for every unit. Panicked units are logged and counted.
pub(crate) async fn join_all<T: 'static>(mut units: JoinSet<T>) -> (Vec<T>, usize) {
    let mut results = Vec::with_capacity(units.len());
    let mut panicked = 0;
    while let Some(joined) = units.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => {
                error!(error = %e, "account unit panicked");
                panicked += 1;
            }
        }
    }
    (results, panicked)
}
