//! Run statistics
//!
//! Six counters behind one mutex. Each increment is its own critical section;
//! `record` therefore takes the lock twice (outcome bucket, then `processed`).

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

/// Final classification of one processed account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
    Locked,
    Suspended,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failed => "failed",
            Outcome::Locked => "locked",
            Outcome::Suspended => "suspended",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub locked: usize,
    pub suspended: usize,
}

/// Thread-safe run counters, allocated fresh per run and shared by `Arc`.
#[derive(Debug)]
pub struct Statistics {
    counters: Mutex<StatsSnapshot>,
}

impl Statistics {
    pub fn new(total: usize) -> Self {
        Self {
            counters: Mutex::new(StatsSnapshot {
                total,
                ..StatsSnapshot::default()
            }),
        }
    }

    // Counters stay meaningful even if a worker panicked mid-increment.
    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn increment_processed(&self) {
        self.lock().processed += 1;
    }

    pub fn increment_success(&self) {
        self.lock().success += 1;
    }

    pub fn increment_failed(&self) {
        self.lock().failed += 1;
    }

    pub fn increment_locked(&self) {
        self.lock().locked += 1;
    }

    pub fn increment_suspended(&self) {
        self.lock().suspended += 1;
    }

    /// Record one account's final outcome: its bucket, then `processed`.
    ///
    /// Callers invoke this exactly once per processed account.
    pub fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.increment_success(),
            Outcome::Failed => self.increment_failed(),
            Outcome::Locked => self.increment_locked(),
            Outcome::Suspended => self.increment_suspended(),
        }
        self.increment_processed();
        metrics::counter!("accounts_outcome_total", "outcome" => outcome.label()).increment(1);
        debug!(%outcome, "recorded account outcome");
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        *self.lock()
    }
}
