//! Per-account task execution
//!
//! `process_account` is one account unit: build a client, run the validity
//! gate, then every selected task in order with bounded retries. Whatever
//! happens inside, the unit records exactly one outcome in `Statistics` and
//! returns an `AccountReport`; nothing propagates past the account boundary.

use std::sync::Arc;

use account_client::{AccountClient, ClientFactory};
use account_store::{AccountStore, AccountUpdate};
use common::{Account, AccountStatus};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::classify::{classify_validation, outcome_for, terminal_status};
use crate::pacing::pause;
use crate::settings::RunSettings;
use crate::stats::{Outcome, Statistics};
use crate::task::{Action, TaskKind, TaskSet};

/// Everything an account unit needs besides its own account.
#[derive(Clone)]
pub struct RunContext {
    pub settings: RunSettings,
    pub factory: Arc<dyn ClientFactory>,
    pub store: Arc<dyn AccountStore>,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(
        settings: RunSettings,
        factory: Arc<dyn ClientFactory>,
        store: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            settings,
            factory,
            store,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Write a checkpoint for `account`. Store failures are logged only; a
    /// lost checkpoint never fails the account.
    pub(crate) async fn persist(&self, account: &Account, update: AccountUpdate) {
        if update.is_empty() {
            return;
        }
        if let Err(e) = self
            .store
            .update(account.auth_token.expose(), update)
            .await
        {
            warn!(error = %e, "failed to persist account state");
        }
    }
}

/// What happened to one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    /// Position in the dispatched list
    pub index: usize,
    pub username: String,
    pub token_hint: String,
    /// Last status written for the account
    pub status: AccountStatus,
    pub outcome: Outcome,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    /// Tasks never attempted because the account stopped early
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

impl AccountReport {
    pub(crate) fn new(index: usize, account: &Account) -> Self {
        Self {
            index,
            username: account.username.clone(),
            token_hint: account.token_hint(),
            status: account.status,
            outcome: Outcome::Failed,
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    pub(crate) fn finish(mut self, status: AccountStatus, outcome: Outcome) -> Self {
        self.status = status;
        self.outcome = outcome;
        self
    }

    fn skip_rest(&mut self, tasks: &[TaskKind]) {
        self.skipped
            .extend(tasks.iter().map(|kind| kind.label().to_string()));
    }
}

/// How one task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskResult {
    Completed,
    Failed,
    /// Account-level failure reported by the platform
    Terminal(AccountStatus),
    Cancelled,
}

/// Run one account unit and record its outcome in `stats`.
pub async fn process_account(
    ctx: &RunContext,
    tasks: &TaskSet,
    stats: &Statistics,
    index: usize,
    account: Account,
) -> AccountReport {
    let span = info_span!("account", index, account = %account.token_hint());
    async move {
        let report = run_account(ctx, tasks, index, account).await;
        stats.record(report.outcome);
        info!(
            outcome = %report.outcome,
            status = %report.status,
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "account finished"
        );
        report
    }
    .instrument(span)
    .await
}

async fn run_account(
    ctx: &RunContext,
    tasks: &TaskSet,
    index: usize,
    mut account: Account,
) -> AccountReport {
    let mut report = AccountReport::new(index, &account);
    if ctx.cancel.is_cancelled() {
        report.cancelled = true;
        report.skip_rest(&tasks.tasks);
        let status = account.status;
        return report.finish(status, Outcome::Failed);
    }

    let client = match ctx.factory.connect(&account).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "failed to create client");
            ctx.persist(&account, AccountUpdate::status(AccountStatus::Unknown))
                .await;
            report.skip_rest(&tasks.tasks);
            return report.finish(AccountStatus::Unknown, Outcome::Failed);
        }
    };

    let (info, result) = client.is_valid().await;
    let status = classify_validation(&info, &result);
    if !info.username.is_empty() {
        account.username = info.username.clone();
        report.username = info.username.clone();
    }
    ctx.persist(
        &account,
        AccountUpdate::status(status).with_username(&info.username),
    )
    .await;
    if status != AccountStatus::Valid {
        warn!(%status, error = result.error_message(), "validity check failed");
        report.skip_rest(&tasks.tasks);
        return report.finish(status, outcome_for(status));
    }
    info!(username = %account.username, "account is valid");

    let mut status = AccountStatus::Valid;
    for (position, kind) in tasks.tasks.iter().copied().enumerate() {
        let label = kind.label().to_string();
        let action = match tasks.input.resolve(kind, index) {
            Ok(Some(action)) => action,
            Ok(None) => {
                report.completed.push(label);
                continue;
            }
            Err(e) => {
                warn!(task = kind.label(), error = %e, "task input unavailable");
                report.failed.push(label);
                continue;
            }
        };

        match run_task(ctx, client.as_ref(), tasks, kind, index, action).await {
            TaskResult::Completed => report.completed.push(label),
            TaskResult::Failed => report.failed.push(label),
            TaskResult::Terminal(terminal) => {
                report.failed.push(label);
                if terminal != status {
                    ctx.persist(&account, AccountUpdate::status(terminal)).await;
                    status = terminal;
                }
            }
            TaskResult::Cancelled => {
                info!(task = kind.label(), "run cancelled, stopping account");
                report.failed.push(label);
                report.cancelled = true;
                report.skip_rest(&tasks.tasks[position + 1..]);
                return report.finish(status, Outcome::Failed);
            }
        }
    }

    // Past the validity gate an account is either a success or a failure
    let outcome = if report.failed.is_empty() {
        Outcome::Success
    } else {
        Outcome::Failed
    };
    report.finish(status, outcome)
}

/// Attempt one task up to `retries` times.
///
/// Each attempt runs only the steps (targets) that have not succeeded yet.
/// Retries resolve the action again so randomly selected texts and pictures
/// are drawn per attempt; target lists never change between attempts.
async fn run_task(
    ctx: &RunContext,
    client: &dyn AccountClient,
    tasks: &TaskSet,
    kind: TaskKind,
    index: usize,
    mut action: Action,
) -> TaskResult {
    let task = kind.label();
    let retries = ctx.settings.retries;
    let mut pending: Vec<usize> = (0..action.step_count()).collect();

    for attempt in 1..=retries {
        if ctx.cancel.is_cancelled() {
            return TaskResult::Cancelled;
        }
        if attempt > 1
            && let Ok(Some(redrawn)) = tasks.input.resolve(kind, index)
        {
            action = redrawn;
        }

        let mut still_pending = Vec::new();
        for &step in &pending {
            let result = action.perform(client, step).await;
            if result.success {
                debug!(task, attempt, on = action.step_target(step), "step succeeded");
                continue;
            }
            if let Some(status) = terminal_status(&result) {
                metrics::counter!("task_attempts_total", "task" => task, "result" => "terminal")
                    .increment(1);
                warn!(task, attempt, %status, error = result.error_message(), "account failure during task");
                return TaskResult::Terminal(status);
            }
            warn!(
                task,
                attempt,
                on = action.step_target(step),
                error = result.error_message(),
                "attempt failed"
            );
            still_pending.push(step);
        }
        pending = still_pending;

        if pending.is_empty() {
            metrics::counter!("task_attempts_total", "task" => task, "result" => "success")
                .increment(1);
            info!(task, attempt, "task completed");
            return TaskResult::Completed;
        }
        metrics::counter!("task_attempts_total", "task" => task, "result" => "failure")
            .increment(1);

        if attempt < retries && !pause(ctx.settings.pause_between_retries, &ctx.cancel).await {
            return TaskResult::Cancelled;
        }
    }

    warn!(task, retries, remaining = pending.len(), "task failed after all attempts");
    TaskResult::Failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Selection, TaskInput};
    use crate::testing::{MockClient, MockFactory, accounts, context, fast_settings};
    use account_client::{ActionResult, ActionStatus};
    use account_store::MemoryAccountStore;
    use common::Range;
    use std::time::Duration;

    fn store_for(accounts: &[Account]) -> Arc<MemoryAccountStore> {
        Arc::new(MemoryAccountStore::new(accounts.to_vec()))
    }

    fn follow_tasks(targets: &[&str]) -> TaskSet {
        TaskSet::new(
            vec![TaskKind::Follow],
            TaskInput {
                follow_targets: targets.iter().map(|t| t.to_string()).collect(),
                ..TaskInput::default()
            },
        )
    }

    async fn run_one(
        factory: Arc<MockFactory>,
        settings: RunSettings,
        tasks: &TaskSet,
    ) -> (AccountReport, Statistics, Arc<MemoryAccountStore>) {
        let accounts = accounts(1);
        let store = store_for(&accounts);
        let ctx = context(settings, factory, store.clone());
        let stats = Statistics::new(1);
        let report = process_account(&ctx, tasks, &stats, 0, accounts[0].clone()).await;
        (report, stats, store)
    }

    #[tokio::test]
    async fn failing_task_is_attempted_exactly_retries_times() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").always("follow", ActionResult::failed("rate limited")),
        ));
        let (report, stats, _) =
            run_one(factory.clone(), fast_settings(1, 3), &follow_tasks(&["bob"])).await;

        assert_eq!(factory.get("tok0").count("follow"), 3);
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.failed, vec!["Follow".to_string()]);
        let snap = stats.snapshot();
        assert_eq!((snap.processed, snap.failed, snap.success), (1, 1, 0));
    }

    #[tokio::test]
    async fn succeeding_task_stops_retrying() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").script(
                "follow",
                vec![ActionResult::failed("timeout")],
                ActionResult::ok(),
            ),
        ));
        let (report, stats, store) =
            run_one(factory.clone(), fast_settings(1, 5), &follow_tasks(&["bob"])).await;

        assert_eq!(factory.get("tok0").count("follow"), 2);
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(stats.snapshot().success, 1);
        let row = store.get("tok0").await.unwrap();
        assert_eq!(row.status, AccountStatus::Valid);
        assert_eq!(row.username, "alice");
    }

    #[tokio::test]
    async fn suspended_account_runs_no_tasks() {
        let factory = Arc::new(MockFactory::new().client("tok0", MockClient::new("alice").suspended()));
        let (report, stats, store) =
            run_one(factory.clone(), fast_settings(1, 3), &follow_tasks(&["bob"])).await;

        assert_eq!(factory.get("tok0").calls(), vec!["is_valid:".to_string()]);
        assert_eq!(report.outcome, Outcome::Suspended);
        assert_eq!(report.skipped, vec!["Follow".to_string()]);
        let snap = stats.snapshot();
        assert_eq!((snap.processed, snap.suspended), (1, 1));
        let row = store.get("tok0").await.unwrap();
        assert_eq!(row.status, AccountStatus::Suspended);
        assert_eq!(row.username, "alice");
    }

    #[tokio::test]
    async fn auth_error_at_validation_counts_as_failed() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("").validity(
                vec![],
                ActionResult::with_status(ActionStatus::AuthError, "bad token"),
            ),
        ));
        let (report, stats, store) =
            run_one(factory.clone(), fast_settings(1, 3), &follow_tasks(&["bob"])).await;

        assert_eq!(factory.get("tok0").count("follow"), 0);
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(stats.snapshot().failed, 1);
        let row = store.get("tok0").await.unwrap();
        assert_eq!(row.status, AccountStatus::AuthError);
        assert_eq!(row.username, "");
    }

    #[tokio::test]
    async fn locked_at_validation_counts_as_locked() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice")
                .validity(vec![], ActionResult::with_status(ActionStatus::Locked, "locked")),
        ));
        let (report, stats, _) =
            run_one(factory, fast_settings(1, 3), &follow_tasks(&["bob"])).await;

        assert_eq!(report.outcome, Outcome::Locked);
        assert_eq!(report.status, AccountStatus::Locked);
        assert_eq!(stats.snapshot().locked, 1);
    }

    #[tokio::test]
    async fn client_construction_failure_is_not_retried() {
        let factory = Arc::new(MockFactory::new().refuse("tok0"));
        let (report, stats, store) =
            run_one(factory.clone(), fast_settings(1, 3), &follow_tasks(&["bob"])).await;

        assert_eq!(factory.connects(), 1);
        assert_eq!(report.outcome, Outcome::Failed);
        let snap = stats.snapshot();
        assert_eq!((snap.processed, snap.failed), (1, 1));
        let updates = store.updates().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.status, Some(AccountStatus::Unknown));
    }

    #[tokio::test]
    async fn every_selected_task_is_attempted() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").always("follow", ActionResult::failed("nope")),
        ));
        let tasks = TaskSet::new(
            vec![TaskKind::Follow, TaskKind::Like, TaskKind::Tweet],
            TaskInput {
                follow_targets: vec!["bob".into()],
                like_links: vec!["https://x.com/s/1".into()],
                tweets: vec!["gm".into()],
                ..TaskInput::default()
            },
        );
        let (report, _, _) = run_one(factory.clone(), fast_settings(1, 2), &tasks).await;

        let client = factory.get("tok0");
        assert_eq!(client.count("follow"), 2);
        assert_eq!(client.count("like"), 1);
        assert_eq!(client.count("tweet"), 1);
        assert_eq!(report.failed, vec!["Follow".to_string()]);
        assert_eq!(report.completed, vec!["Like".to_string(), "Tweet".to_string()]);
        assert_eq!(report.outcome, Outcome::Failed);
    }

    #[tokio::test]
    async fn only_pending_targets_are_retried() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").script(
                "follow",
                vec![
                    ActionResult::ok(),
                    ActionResult::failed("timeout"),
                    ActionResult::ok(),
                ],
                ActionResult::ok(),
            ),
        ));
        let (report, _, _) =
            run_one(factory.clone(), fast_settings(1, 3), &follow_tasks(&["a", "b", "c"])).await;

        assert_eq!(
            factory.get("tok0").calls(),
            vec!["is_valid:", "follow:a", "follow:b", "follow:c", "follow:b"]
        );
        assert_eq!(report.outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn locked_mid_task_still_attempts_remaining_tasks() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice")
                .always("follow", ActionResult::with_status(ActionStatus::Locked, "locked")),
        ));
        let tasks = TaskSet::new(
            vec![TaskKind::Follow, TaskKind::Like],
            TaskInput {
                follow_targets: vec!["bob".into()],
                like_links: vec!["https://x.com/s/1".into()],
                ..TaskInput::default()
            },
        );
        let (report, stats, store) = run_one(factory.clone(), fast_settings(1, 3), &tasks).await;

        let client = factory.get("tok0");
        assert_eq!(client.count("follow"), 1, "terminal result is not retried");
        assert_eq!(client.count("like"), 1);
        assert!(report.skipped.is_empty());
        assert_eq!(report.failed, vec!["Follow".to_string()]);
        assert_eq!(report.completed, vec!["Like".to_string()]);
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.status, AccountStatus::Locked);
        let snap = stats.snapshot();
        assert_eq!((snap.processed, snap.failed, snap.locked), (1, 1, 0));
        assert_eq!(
            store.get("tok0").await.unwrap().status,
            AccountStatus::Locked
        );
    }

    #[tokio::test]
    async fn auth_error_mid_task_moves_on_to_next_task() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice")
                .always("follow", ActionResult::with_status(ActionStatus::AuthError, "expired")),
        ));
        let tasks = TaskSet::new(
            vec![TaskKind::Follow, TaskKind::Like],
            TaskInput {
                follow_targets: vec!["bob".into()],
                like_links: vec!["https://x.com/s/1".into()],
                ..TaskInput::default()
            },
        );
        let (report, stats, store) = run_one(factory.clone(), fast_settings(1, 3), &tasks).await;

        let client = factory.get("tok0");
        assert_eq!(client.count("follow"), 1);
        assert_eq!(client.count("like"), 1);
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(stats.snapshot().failed, 1);
        assert_eq!(
            store.get("tok0").await.unwrap().status,
            AccountStatus::AuthError
        );
    }

    #[tokio::test]
    async fn random_text_is_drawn_again_on_retry() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").always("tweet", ActionResult::failed("timeout")),
        ));
        let tasks = TaskSet::new(
            vec![TaskKind::Tweet],
            TaskInput {
                tweets: (0..10).map(|i| format!("text {i}")).collect(),
                selection: Selection::Random,
                ..TaskInput::default()
            },
        );
        let (report, _, _) = run_one(factory.clone(), fast_settings(1, 20), &tasks).await;

        let calls = factory.get("tok0").calls();
        let texts: std::collections::HashSet<&String> =
            calls.iter().filter(|c| c.starts_with("tweet:")).collect();
        assert_eq!(factory.get("tok0").count("tweet"), 20);
        assert!(texts.len() > 1, "every retry reused one text: {texts:?}");
        assert_eq!(report.outcome, Outcome::Failed);
    }

    #[tokio::test]
    async fn indexed_text_is_stable_across_retries() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").always("tweet", ActionResult::failed("timeout")),
        ));
        let tasks = TaskSet::new(
            vec![TaskKind::Tweet],
            TaskInput {
                tweets: vec!["first".into(), "second".into()],
                ..TaskInput::default()
            },
        );
        run_one(factory.clone(), fast_settings(1, 3), &tasks).await;

        assert_eq!(
            factory.get("tok0").calls(),
            vec!["is_valid:", "tweet:first", "tweet:first", "tweet:first"]
        );
    }

    #[tokio::test]
    async fn check_valid_task_is_a_no_op() {
        let factory = Arc::new(MockFactory::new().client("tok0", MockClient::new("alice")));
        let tasks = TaskSet::new(vec![TaskKind::CheckValid], TaskInput::default());
        let (report, stats, _) = run_one(factory.clone(), fast_settings(1, 3), &tasks).await;

        assert_eq!(factory.get("tok0").calls(), vec!["is_valid:".to_string()]);
        assert_eq!(report.completed, vec!["Check Valid".to_string()]);
        assert_eq!(stats.snapshot().success, 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_counts_as_failed() {
        let factory = Arc::new(MockFactory::new().client("tok0", MockClient::new("alice")));
        let accounts = accounts(1);
        let ctx = context(fast_settings(1, 3), factory.clone(), store_for(&accounts));
        ctx.cancel.cancel();
        let stats = Statistics::new(1);
        let report =
            process_account(&ctx, &follow_tasks(&["bob"]), &stats, 0, accounts[0].clone()).await;

        assert!(report.cancelled);
        assert_eq!(factory.connects(), 0);
        let snap = stats.snapshot();
        assert_eq!((snap.processed, snap.failed), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_retry_pause() {
        let factory = Arc::new(MockFactory::new().client(
            "tok0",
            MockClient::new("alice").always("follow", ActionResult::failed("timeout")),
        ));
        let settings = RunSettings {
            pause_between_retries: Range::fixed(600),
            ..fast_settings(1, 3)
        };
        let accounts = accounts(1);
        let ctx = context(settings, factory.clone(), store_for(&accounts));
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });
        let stats = Statistics::new(1);
        let report =
            process_account(&ctx, &follow_tasks(&["bob"]), &stats, 0, accounts[0].clone()).await;

        assert_eq!(factory.get("tok0").count("follow"), 1);
        assert!(report.cancelled);
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(stats.snapshot().processed, 1);
    }
}
