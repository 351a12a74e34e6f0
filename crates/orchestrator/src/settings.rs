//! Run settings shared by the task scheduler and mutual subscription

use common::Range;

use crate::error::{Error, Result};

/// Worker pool, retry and pacing settings.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Maximum account units running at once
    pub threads: usize,
    /// Attempts per task (and per validity check in mutual subscription)
    pub retries: u32,
    /// Seconds to wait between attempts of one task
    pub pause_between_retries: Range,
    /// Seconds between account dispatches
    pub pause_between_accounts: Range,
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidSettings(
                "threads must be greater than 0".into(),
            ));
        }
        if self.retries == 0 {
            return Err(Error::InvalidSettings("retries must be at least 1".into()));
        }
        self.pause_between_retries.validate("pause_between_retries")?;
        self.pause_between_accounts
            .validate("pause_between_accounts")?;
        Ok(())
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            threads: 1,
            retries: 3,
            pause_between_retries: Range::new(1, 3),
            pause_between_accounts: Range::new(3, 10),
        }
    }
}

/// Mutual-subscription settings.
#[derive(Debug, Clone)]
pub struct MutualSettings {
    /// Followers each account should receive, drawn per account
    pub followers_for_every_account: Range,
    /// Count accounts that never validate as failed (or locked/suspended)
    /// instead of silently leaving them out of the statistics
    pub count_unvalidated_as_failed: bool,
}

impl MutualSettings {
    pub fn validate(&self) -> Result<()> {
        self.followers_for_every_account
            .validate("followers_for_every_account")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(RunSettings::default().validate().is_ok());
    }

    #[test]
    fn zero_threads_rejected() {
        let settings = RunSettings {
            threads: 0,
            ..RunSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("threads"), "got: {err}");
    }

    #[test]
    fn zero_retries_rejected() {
        let settings = RunSettings {
            retries: 0,
            ..RunSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidSettings(_))
        ));
    }

    #[test]
    fn reversed_pause_rejected() {
        let settings = RunSettings {
            pause_between_accounts: Range::new(9, 2),
            ..RunSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(
            err.to_string().contains("pause_between_accounts"),
            "got: {err}"
        );
    }

    #[test]
    fn reversed_followers_range_rejected() {
        let settings = MutualSettings {
            followers_for_every_account: Range::new(4, 1),
            count_unvalidated_as_failed: false,
        };
        assert!(settings.validate().is_err());
    }
}
