//! Account selection: range or exact list, then optional shuffle

use common::Account;
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::config::Settings;

/// Pick the accounts to run from the full table.
///
/// `accounts_range` is 1-based and inclusive, clamped to the table. When it is
/// `[0, 0]`, `exact_accounts` (1-based numbers, out-of-range entries dropped)
/// is used if set, otherwise every account.
pub fn select(all: Vec<Account>, settings: &Settings) -> Vec<Account> {
    let available = all.len();
    let range = settings.accounts_range;

    let mut selected: Vec<Account> = if range.start == 0 && range.end == 0 {
        if settings.exact_accounts.is_empty() {
            all
        } else {
            let picked: Vec<Account> = settings
                .exact_accounts
                .iter()
                .filter_map(|&number| {
                    let account = number.checked_sub(1).and_then(|i| all.get(i)).cloned();
                    if account.is_none() {
                        warn!(number, available, "exact account out of range, skipping");
                    }
                    account
                })
                .collect();
            picked
        }
    } else {
        let start = usize::try_from(range.start.max(1)).unwrap_or(usize::MAX);
        let end = usize::try_from(range.end)
            .unwrap_or(usize::MAX)
            .min(available);
        if start > end {
            Vec::new()
        } else {
            all.into_iter().skip(start - 1).take(end + 1 - start).collect()
        }
    };

    if settings.shuffle_accounts {
        selected.shuffle(&mut rand::rng());
    }
    info!(
        available,
        selected = selected.len(),
        order = if settings.shuffle_accounts { "random" } else { "sequential" },
        "accounts selected"
    );
    selected
}
