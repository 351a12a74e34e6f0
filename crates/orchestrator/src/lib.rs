//! Multi-account batch orchestration
//!
//! Drives a list of accounts through a list of selected tasks under a bounded
//! worker pool, and plans/executes mutual-subscription follow exchanges.
//!
//! Task run (`Scheduler`):
//! 1. Settings and task input are validated before anything is dispatched
//! 2. The dispatch loop acquires a semaphore permit per account, spawns the
//!    account unit, then sleeps `pause_between_accounts` before the next one
//! 3. Each unit (`process_account`) builds a client, runs the validity gate,
//!    then every selected task in order with bounded retries
//! 4. Every unit records exactly one outcome plus `processed` in `Statistics`
//! 5. The run returns a `RunSummary` once every unit has finished
//!
//! Mutual subscription (`MutualSubscription`): Filter → Plan → Execute → Report.
//! The follow plan is built in full before the first follow is attempted.
//!
//! A `CancellationToken` in the `RunContext` is honoured between dispatches,
//! at every retry boundary and during every pause.

pub mod classify;
pub mod error;
pub mod executor;
pub mod mutual;
pub mod pacing;
pub mod scheduler;
pub mod settings;
pub mod stats;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use executor::{AccountReport, RunContext, process_account};
pub use mutual::{AccountInstance, MutualSubscription, Phase, SubscriptionPlan, build_plan};
pub use scheduler::{RunSummary, Scheduler};
pub use settings::{MutualSettings, RunSettings};
pub use stats::{Outcome, Statistics, StatsSnapshot};
pub use task::{Action, PollTarget, Selection, TaskInput, TaskKind, TaskSet, parse_selection};
