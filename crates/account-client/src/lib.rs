//! Account client abstraction for platform actions
//!
//! Defines the `AccountClient` trait that decouples orchestration from the
//! platform's private API. A client is bound to one account (credentials,
//! proxy, session state) and exposes one method per action, each returning a
//! uniform `ActionResult`. Transport details (TLS fingerprint, cookies,
//! request timeouts, response parsing) live entirely inside implementations.
//!
//! `ClientFactory` builds a client for an account; `DryRunFactory` is the
//! built-in implementation that performs no network I/O.

pub mod dry_run;
pub mod error;

pub use dry_run::{DryRunClient, DryRunFactory};
pub use error::{Error, Result};

use common::Account;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used by the client traits so they stay dyn-compatible
/// (`Arc<dyn AccountClient>`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Classification attached to a failed action.
///
/// This is the only signal the orchestrator uses to tell terminal account
/// failures from transient ones; error strings are never inspected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionStatus {
    /// Credentials rejected
    AuthError,
    /// Account locked by the platform
    Locked,
    /// Anything else (network, rate limit, unexpected response)
    #[default]
    Unspecified,
}

/// Uniform outcome of one client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    pub error: Option<String>,
    pub status: ActionStatus,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            status: ActionStatus::Unspecified,
        }
    }

    /// Failure with no particular classification.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::with_status(ActionStatus::Unspecified, error)
    }

    pub fn with_status(status: ActionStatus, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            status,
        }
    }

    /// Error text for logs.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("no error detail")
    }
}

/// Identity reported by the validity check.
///
/// `suspended` is reported independently of `ActionResult.status` and takes
/// priority over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub username: String,
    pub suspended: bool,
}

/// Extra payload for a tweet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetOptions {
    /// Base64-encoded picture
    pub media_base64: Option<String>,
    /// Tweet to quote
    pub quote_tweet_url: Option<String>,
}

/// Editable profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Bio,
    Location,
    Avatar,
    Banner,
}

impl ProfileField {
    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Bio => "bio",
            ProfileField::Location => "location",
            ProfileField::Avatar => "avatar",
            ProfileField::Banner => "banner",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated per-account capability.
///
/// Every action method performs at most one platform interaction and reports
/// its outcome; retries and pacing belong to the caller.
pub trait AccountClient: Send + Sync {
    /// Validity check: resolves the username and suspension flag.
    fn is_valid(&self) -> BoxFuture<'_, (AccountInfo, ActionResult)>;

    fn follow<'a>(&'a self, username: &'a str) -> BoxFuture<'a, ActionResult>;

    fn unfollow<'a>(&'a self, username: &'a str) -> BoxFuture<'a, ActionResult>;

    fn like<'a>(&'a self, tweet_link: &'a str) -> BoxFuture<'a, ActionResult>;

    fn retweet<'a>(&'a self, tweet_link: &'a str) -> BoxFuture<'a, ActionResult>;

    fn tweet<'a>(&'a self, text: &'a str, options: TweetOptions) -> BoxFuture<'a, ActionResult>;

    fn comment<'a>(
        &'a self,
        text: &'a str,
        tweet_link: &'a str,
        media_base64: Option<String>,
    ) -> BoxFuture<'a, ActionResult>;

    fn vote_poll<'a>(&'a self, poll_link: &'a str, choice: &'a str) -> BoxFuture<'a, ActionResult>;

    fn change_profile<'a>(
        &'a self,
        field: ProfileField,
        value: &'a str,
    ) -> BoxFuture<'a, ActionResult>;
}

/// Builds a client bound to one account's credentials and proxy.
///
/// A construction error usually means a malformed credential or proxy and is
/// not retried by the task executor.
pub trait ClientFactory: Send + Sync {
    fn connect<'a>(&'a self, account: &'a Account) -> BoxFuture<'a, Result<Arc<dyn AccountClient>>>;
}
