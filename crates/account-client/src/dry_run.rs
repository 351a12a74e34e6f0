//! Dry-run client: logs every action and reports success
//!
//! Lets the runner exercise config, pacing, retries and reporting end to end
//! without a platform client. No network I/O is performed.

use crate::{
    AccountClient, AccountInfo, ActionResult, BoxFuture, ClientFactory, Error, ProfileField,
    TweetOptions,
};
use common::Account;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Factory producing `DryRunClient`s.
///
/// Accounts without a stored username get a generated `dryrun_<n>` name so
/// mutual-subscription plans stay irreflexive.
#[derive(Debug, Default)]
pub struct DryRunFactory {
    generated: AtomicUsize,
}

impl DryRunFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientFactory for DryRunFactory {
    fn connect<'a>(
        &'a self,
        account: &'a Account,
    ) -> BoxFuture<'a, crate::Result<Arc<dyn AccountClient>>> {
        Box::pin(async move {
            if account.auth_token.expose().trim().is_empty() {
                return Err(Error::InvalidCredentials("empty auth token".into()));
            }
            if !account.proxy.is_empty() && !account.proxy.contains(':') {
                return Err(Error::InvalidProxy(
                    "expected host:port or user:pass@host:port".into(),
                ));
            }
            let username = if account.username.is_empty() {
                let n = self.generated.fetch_add(1, Ordering::Relaxed) + 1;
                format!("dryrun_{n}")
            } else {
                account.username.clone()
            };
            let client: Arc<dyn AccountClient> = Arc::new(DryRunClient::new(username));
            Ok(client)
        })
    }
}

/// Client that succeeds at everything.
#[derive(Debug, Clone)]
pub struct DryRunClient {
    username: String,
}

impl DryRunClient {
    pub fn new(username: String) -> Self {
        Self { username }
    }

    fn record(&self, action: &str, target: &str) -> BoxFuture<'_, ActionResult> {
        info!(username = %self.username, action, target, "dry run");
        Box::pin(async { ActionResult::ok() })
    }
}

impl AccountClient for DryRunClient {
    fn is_valid(&self) -> BoxFuture<'_, (AccountInfo, ActionResult)> {
        let info = AccountInfo {
            username: self.username.clone(),
            suspended: false,
        };
        Box::pin(async move { (info, ActionResult::ok()) })
    }

    fn follow<'a>(&'a self, username: &'a str) -> BoxFuture<'a, ActionResult> {
        self.record("follow", username)
    }

    fn unfollow<'a>(&'a self, username: &'a str) -> BoxFuture<'a, ActionResult> {
        self.record("unfollow", username)
    }

    fn like<'a>(&'a self, tweet_link: &'a str) -> BoxFuture<'a, ActionResult> {
        self.record("like", tweet_link)
    }

    fn retweet<'a>(&'a self, tweet_link: &'a str) -> BoxFuture<'a, ActionResult> {
        self.record("retweet", tweet_link)
    }

    fn tweet<'a>(&'a self, _text: &'a str, options: TweetOptions) -> BoxFuture<'a, ActionResult> {
        let target = options.quote_tweet_url.unwrap_or_default();
        info!(
            username = %self.username,
            action = "tweet",
            target = %target,
            picture = options.media_base64.is_some(),
            "dry run"
        );
        Box::pin(async { ActionResult::ok() })
    }

    fn comment<'a>(
        &'a self,
        _text: &'a str,
        tweet_link: &'a str,
        media_base64: Option<String>,
    ) -> BoxFuture<'a, ActionResult> {
        info!(
            username = %self.username,
            action = "comment",
            target = tweet_link,
            picture = media_base64.is_some(),
            "dry run"
        );
        Box::pin(async { ActionResult::ok() })
    }

    fn vote_poll<'a>(&'a self, poll_link: &'a str, choice: &'a str) -> BoxFuture<'a, ActionResult> {
        info!(username = %self.username, action = "vote_poll", target = poll_link, choice, "dry run");
        Box::pin(async { ActionResult::ok() })
    }

    fn change_profile<'a>(
        &'a self,
        field: ProfileField,
        _value: &'a str,
    ) -> BoxFuture<'a, ActionResult> {
        self.record("change_profile", field.label())
    }
}
