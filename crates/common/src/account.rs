//! Account row shared by the store, the client factory and the orchestrator

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::secret::Secret;

/// Persisted account status.
///
/// `Valid` is written after a successful validity check; the remaining
/// non-`Unknown` values are terminal for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Unknown,
    Valid,
    AuthError,
    Locked,
    Suspended,
}

impl AccountStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AccountStatus::Unknown => "UNKNOWN",
            AccountStatus::Valid => "VALID",
            AccountStatus::AuthError => "AUTH_ERROR",
            AccountStatus::Locked => "LOCKED",
            AccountStatus::Suspended => "SUSPENDED",
        }
    }

    /// Whether this status sets the account aside for the rest of the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AccountStatus::AuthError | AccountStatus::Locked | AccountStatus::Suspended
        )
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AccountStatus {
    type Err = Error;

    /// Parses the stored label. An empty cell reads as `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "UNKNOWN" => Ok(AccountStatus::Unknown),
            "VALID" => Ok(AccountStatus::Valid),
            "AUTH_ERROR" => Ok(AccountStatus::AuthError),
            "LOCKED" => Ok(AccountStatus::Locked),
            "SUSPENDED" => Ok(AccountStatus::Suspended),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// One credential set: auth token, assigned proxy and mutable username/status.
#[derive(Clone)]
pub struct Account {
    pub auth_token: Secret<String>,
    pub proxy: String,
    pub username: String,
    pub status: AccountStatus,
}

impl Account {
    pub fn new(auth_token: impl Into<String>, proxy: impl Into<String>) -> Self {
        Self {
            auth_token: Secret::new(auth_token.into()),
            proxy: proxy.into(),
            username: String::new(),
            status: AccountStatus::Unknown,
        }
    }

    /// Masked token for log lines.
    pub fn token_hint(&self) -> String {
        self.auth_token.hint()
    }
}

// Proxies usually embed credentials, so Debug only reports whether one is set.
impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("auth_token", &self.auth_token)
            .field("proxy", &!self.proxy.is_empty())
            .field("username", &self.username)
            .field("status", &self.status)
            .finish()
    }
}
