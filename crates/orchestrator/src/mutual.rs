//! Mutual subscription: accounts follow each other
//!
//! Four phases, always in order:
//!
//! 1. **Filter**: validate every account concurrently, keep the ones that
//!    resolve a username
//! 2. **Plan**: for each kept account draw a follower count and pick that many
//!    distinct other accounts to follow it
//! 3. **Execute**: every account follows its planned targets
//! 4. **Report**: statistics over the executed accounts
//!
//! The plan is fully built before the first follow is attempted and is only
//! read afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use account_client::AccountClient;
use account_store::AccountUpdate;
use common::{Account, AccountStatus, Range};
use rand::RngExt;
use rand::seq::SliceRandom;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::classify::{classify_validation, outcome_for, terminal_status};
use crate::error::Result;
use crate::executor::{AccountReport, RunContext};
use crate::pacing::pause;
use crate::scheduler::{RunSummary, dispatch, join_all};
use crate::settings::MutualSettings;
use crate::stats::{Outcome, Statistics};

/// Run phase, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Filter,
    Plan,
    Execute,
    Report,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Filter => "filter",
            Phase::Plan => "plan",
            Phase::Execute => "execute",
            Phase::Report => "report",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An account that passed the filter, with its live client.
#[derive(Clone)]
pub struct AccountInstance {
    /// Position in the input list
    pub index: usize,
    pub account: Account,
    pub client: Arc<dyn AccountClient>,
}

impl AccountInstance {
    pub fn username(&self) -> &str {
        &self.account.username
    }
}

impl fmt::Debug for AccountInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountInstance")
            .field("index", &self.index)
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Who follows whom: follower username to ordered target usernames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionPlan {
    follows: HashMap<String, Vec<String>>,
}

impl SubscriptionPlan {
    /// Accounts `follower` must follow, in plan order.
    pub fn targets_for(&self, follower: &str) -> &[String] {
        self.follows.get(follower).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Accounts planned to follow `target`.
    pub fn followers_of(&self, target: &str) -> Vec<&str> {
        let mut followers: Vec<&str> = self
            .follows
            .iter()
            .filter(|(_, targets)| targets.iter().any(|t| t == target))
            .map(|(follower, _)| follower.as_str())
            .collect();
        followers.sort_unstable();
        followers
    }

    /// Number of planned follow edges.
    pub fn len(&self) -> usize {
        self.follows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the follow plan for distinct `usernames`.
///
/// For each account A in order: draw `k` from `followers`, shuffle every other
/// account, clamp `k` to that pool, and append A to the follow list of the
/// first `k`. A therefore gets `min(k, n - 1)` distinct followers and never
/// follows itself.
pub fn build_plan<R: RngExt + ?Sized>(
    usernames: &[String],
    followers: Range,
    rng: &mut R,
) -> SubscriptionPlan {
    let mut follows: HashMap<String, Vec<String>> = HashMap::new();
    for (i, target) in usernames.iter().enumerate() {
        let wanted = usize::try_from(followers.sample_with(rng)).unwrap_or(usize::MAX);
        let mut candidates: Vec<&String> = usernames
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, name)| name)
            .collect();
        candidates.shuffle(rng);
        let k = wanted.min(candidates.len());
        for follower in candidates.into_iter().take(k) {
            follows
                .entry(follower.clone())
                .or_default()
                .push(target.clone());
        }
        debug!(account = %target, followers = k, "planned followers");
    }
    SubscriptionPlan { follows }
}

/// Outcome of filtering one account.
enum Validation {
    Accepted(AccountInstance),
    Rejected(AccountReport),
}

/// Mutual-subscription run.
pub struct MutualSubscription {
    ctx: Arc<RunContext>,
    settings: MutualSettings,
}

impl MutualSubscription {
    pub fn new(ctx: RunContext, settings: MutualSettings) -> Self {
        Self {
            ctx: Arc::new(ctx),
            settings,
        }
    }

    pub async fn run(&self, accounts: Vec<Account>) -> Result<RunSummary> {
        self.ctx.settings.validate()?;
        self.settings.validate()?;
        let input = accounts.len();

        info!(phase = %Phase::Filter, accounts = input, "validating accounts");
        let (instances, rejected, lost) = self.filter(accounts).await;
        info!(
            phase = %Phase::Filter,
            valid = instances.len(),
            rejected = rejected.len(),
            lost,
            "filter finished"
        );

        // Dropped accounts stay in `total`, so they show up as total - processed
        let stats = Arc::new(Statistics::new(input));
        let counted_rejects = if self.settings.count_unvalidated_as_failed {
            for _ in 0..lost {
                stats.record(Outcome::Failed);
            }
            for report in &rejected {
                stats.record(report.outcome);
            }
            rejected
        } else {
            Vec::new()
        };

        let plan = {
            let usernames: Vec<String> = instances
                .iter()
                .map(|instance| instance.account.username.clone())
                .collect();
            let mut rng = rand::rng();
            Arc::new(build_plan(
                &usernames,
                self.settings.followers_for_every_account,
                &mut rng,
            ))
        };
        info!(phase = %Phase::Plan, accounts = instances.len(), follows = plan.len(), "plan built");

        info!(phase = %Phase::Execute, accounts = instances.len(), "following");
        let units = dispatch(&self.ctx, instances, |_, instance| {
            let ctx = Arc::clone(&self.ctx);
            let plan = Arc::clone(&plan);
            let stats = Arc::clone(&stats);
            async move {
                let targets = plan.targets_for(instance.username()).to_vec();
                let span = info_span!("account", index = instance.index, username = %instance.username());
                let report = follow_targets(&ctx, &instance, &targets)
                    .instrument(span)
                    .await;
                stats.record(report.outcome);
                report
            }
        })
        .await;
        let (executed, panicked) = join_all(units).await;
        for _ in 0..panicked {
            stats.record(Outcome::Failed);
        }

        let mut reports = counted_rejects;
        reports.extend(executed);
        reports.sort_by_key(|report| report.index);

        let summary = RunSummary {
            stats: stats.snapshot(),
            accounts: reports,
            cancelled: self.ctx.cancel.is_cancelled(),
        };
        info!(
            phase = %Phase::Report,
            processed = summary.stats.processed,
            success = summary.stats.success,
            failed = summary.stats.failed,
            locked = summary.stats.locked,
            suspended = summary.stats.suspended,
            "mutual subscription finished"
        );
        Ok(summary)
    }

    /// Validate every account; accepted instances come back ordered by input
    /// index with duplicate usernames removed. The last value counts filter
    /// units that panicked.
    async fn filter(
        &self,
        accounts: Vec<Account>,
    ) -> (Vec<AccountInstance>, Vec<AccountReport>, usize) {
        let units = dispatch(&self.ctx, accounts, |index, account| {
            let ctx = Arc::clone(&self.ctx);
            let span = info_span!("account", index, account = %account.token_hint());
            async move { validate_account(&ctx, index, account).instrument(span).await }
        })
        .await;
        let (results, panicked) = join_all(units).await;

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for result in results {
            match result {
                Validation::Accepted(instance) => accepted.push(instance),
                Validation::Rejected(report) => rejected.push(report),
            }
        }
        accepted.sort_by_key(|instance| instance.index);
        rejected.sort_by_key(|report| report.index);

        let mut seen = HashSet::new();
        accepted.retain(|instance| {
            let fresh = seen.insert(instance.username().to_string());
            if !fresh {
                warn!(
                    index = instance.index,
                    username = %instance.username(),
                    "duplicate username, dropping account"
                );
            }
            fresh
        });
        (accepted, rejected, panicked)
    }
}

/// Connect and check validity with up to `retries` attempts, pausing
/// `pause_between_accounts` between attempts.
async fn validate_account(ctx: &RunContext, index: usize, mut account: Account) -> Validation {
    let retries = ctx.settings.retries;
    let mut report = AccountReport::new(index, &account);
    let mut last = AccountStatus::Unknown;

    for attempt in 1..=retries {
        if ctx.cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        match ctx.factory.connect(&account).await {
            Err(e) => warn!(attempt, error = %e, "failed to create client"),
            Ok(client) => {
                let (info, result) = client.is_valid().await;
                let status = classify_validation(&info, &result);
                if !info.username.is_empty() {
                    report.username = info.username.clone();
                }
                if status == AccountStatus::Valid && !info.username.is_empty() {
                    account.username = info.username.clone();
                    account.status = AccountStatus::Valid;
                    ctx.persist(
                        &account,
                        AccountUpdate::status(AccountStatus::Valid).with_username(&info.username),
                    )
                    .await;
                    info!(attempt, username = %account.username, "account is valid");
                    return Validation::Accepted(AccountInstance {
                        index,
                        account,
                        client,
                    });
                }
                if status.is_terminal() {
                    warn!(%status, error = result.error_message(), "account unusable");
                    ctx.persist(
                        &account,
                        AccountUpdate::status(status).with_username(&info.username),
                    )
                    .await;
                    return Validation::Rejected(report.finish(status, outcome_for(status)));
                }
                warn!(attempt, %status, error = result.error_message(), "validity check failed");
                last = status;
            }
        }

        if attempt < retries && !pause(ctx.settings.pause_between_accounts, &ctx.cancel).await {
            report.cancelled = true;
            break;
        }
    }

    Validation::Rejected(report.finish(last, outcome_for(last)))
}

/// Follow every planned target with per-target retries.
async fn follow_targets(
    ctx: &RunContext,
    instance: &AccountInstance,
    targets: &[String],
) -> AccountReport {
    let mut report = AccountReport::new(instance.index, &instance.account);
    let retries = ctx.settings.retries;

    if targets.is_empty() {
        info!("no follow targets planned");
        return report.finish(AccountStatus::Valid, Outcome::Success);
    }

    let mut status = AccountStatus::Valid;
    'targets: for (position, target) in targets.iter().enumerate() {
        if position > 0 && !pause(ctx.settings.pause_between_accounts, &ctx.cancel).await {
            report.cancelled = true;
        }
        if report.cancelled || ctx.cancel.is_cancelled() {
            report.cancelled = true;
            report
                .skipped
                .extend(targets[position..].iter().map(|t| format!("follow {t}")));
            break;
        }

        let label = format!("follow {target}");
        for attempt in 1..=retries {
            let result = instance.client.follow(target).await;
            if result.success {
                metrics::counter!("task_attempts_total", "task" => "Follow", "result" => "success")
                    .increment(1);
                info!(followee = %target, attempt, "followed");
                report.completed.push(label);
                continue 'targets;
            }
            if let Some(terminal) = terminal_status(&result) {
                metrics::counter!("task_attempts_total", "task" => "Follow", "result" => "terminal")
                    .increment(1);
                warn!(followee = %target, status = %terminal, error = result.error_message(), "account failure during follow");
                if terminal != status {
                    ctx.persist(&instance.account, AccountUpdate::status(terminal))
                        .await;
                    status = terminal;
                }
                break;
            }
            metrics::counter!("task_attempts_total", "task" => "Follow", "result" => "failure")
                .increment(1);
            warn!(followee = %target, attempt, error = result.error_message(), "follow failed");
            if attempt < retries && !pause(ctx.settings.pause_between_retries, &ctx.cancel).await {
                report.cancelled = true;
                break;
            }
        }
        report.failed.push(label);
    }

    let outcome = if report.failed.is_empty() && !report.cancelled {
        Outcome::Success
    } else {
        Outcome::Failed
    };
    report.finish(status, outcome)
}
