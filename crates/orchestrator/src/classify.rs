//! Outcome classification for validity checks and action results
//!
//! Only `AccountInfo.suspended` and `ActionResult.status` are consulted; error
//! text is never inspected. Suspension takes priority over every status.

use account_client::{AccountInfo, ActionResult, ActionStatus};
use common::AccountStatus;

use crate::stats::Outcome;

/// Classify a validity check into the status to persist.
///
/// `Valid` only when the check succeeded and the account is not suspended.
pub fn classify_validation(info: &AccountInfo, result: &ActionResult) -> AccountStatus {
    if info.suspended {
        return AccountStatus::Suspended;
    }
    if result.success {
        return AccountStatus::Valid;
    }
    match result.status {
        ActionStatus::AuthError => AccountStatus::AuthError,
        ActionStatus::Locked => AccountStatus::Locked,
        ActionStatus::Unspecified => AccountStatus::Unknown,
    }
}

/// Terminal status carried by a failed action, if any.
///
/// `AuthError` and `Locked` set the account aside; everything else is a
/// transient failure that the retry loop handles.
pub fn terminal_status(result: &ActionResult) -> Option<AccountStatus> {
    if result.success {
        return None;
    }
    match result.status {
        ActionStatus::AuthError => Some(AccountStatus::AuthError),
        ActionStatus::Locked => Some(AccountStatus::Locked),
        ActionStatus::Unspecified => None,
    }
}

/// Statistics bucket for an account that stopped with `status`.
pub fn outcome_for(status: AccountStatus) -> Outcome {
    match status {
        AccountStatus::Valid => Outcome::Success,
        AccountStatus::Locked => Outcome::Locked,
        AccountStatus::Suspended => Outcome::Suspended,
        AccountStatus::AuthError | AccountStatus::Unknown => Outcome::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(suspended: bool) -> AccountInfo {
        AccountInfo {
            username: "alice".into(),
            suspended,
        }
    }

    #[test]
    fn successful_check_is_valid() {
        assert_eq!(
            classify_validation(&info(false), &ActionResult::ok()),
            AccountStatus::Valid
        );
    }

    #[test]
    fn suspension_beats_success() {
        assert_eq!(
            classify_validation(&info(true), &ActionResult::ok()),
            AccountStatus::Suspended
        );
    }

    #[test]
    fn suspension_beats_locked_status() {
        let result = ActionResult::with_status(ActionStatus::Locked, "locked");
        assert_eq!(
            classify_validation(&info(true), &result),
            AccountStatus::Suspended
        );
    }

    #[test]
    fn auth_error_status() {
        let result = ActionResult::with_status(ActionStatus::AuthError, "bad token");
        assert_eq!(
            classify_validation(&info(false), &result),
            AccountStatus::AuthError
        );
    }

    #[test]
    fn locked_status() {
        let result = ActionResult::with_status(ActionStatus::Locked, "locked");
        assert_eq!(
            classify_validation(&info(false), &result),
            AccountStatus::Locked
        );
    }

    #[test]
    fn unspecified_failure_is_unknown() {
        let result = ActionResult::failed("connection reset");
        assert_eq!(
            classify_validation(&info(false), &result),
            AccountStatus::Unknown
        );
    }

    #[test]
    fn terminal_status_ignores_transient_failures() {
        assert_eq!(terminal_status(&ActionResult::failed("timeout")), None);
        assert_eq!(terminal_status(&ActionResult::ok()), None);
        assert_eq!(
            terminal_status(&ActionResult::with_status(ActionStatus::Locked, "x")),
            Some(AccountStatus::Locked)
        );
        assert_eq!(
            terminal_status(&ActionResult::with_status(ActionStatus::AuthError, "x")),
            Some(AccountStatus::AuthError)
        );
    }

    #[test]
    fn outcome_buckets() {
        assert_eq!(outcome_for(AccountStatus::Locked), Outcome::Locked);
        assert_eq!(outcome_for(AccountStatus::Suspended), Outcome::Suspended);
        assert_eq!(outcome_for(AccountStatus::AuthError), Outcome::Failed);
        assert_eq!(outcome_for(AccountStatus::Unknown), Outcome::Failed);
    }
}
