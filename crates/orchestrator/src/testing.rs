//! Scripted clients for orchestrator tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use account_client::{
    AccountClient, AccountInfo, ActionResult, BoxFuture, ClientFactory, ProfileField, TweetOptions,
};
use account_store::MemoryAccountStore;
use common::{Account, Range};

use crate::executor::RunContext;
use crate::settings::RunSettings;

/// Results handed out in order, then `fallback` forever.
#[derive(Debug, Clone)]
struct Script {
    queue: VecDeque<ActionResult>,
    fallback: ActionResult,
}

impl Script {
    fn always(result: ActionResult) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: result,
        }
    }

    fn next(&mut self) -> ActionResult {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Tracks how many clients are inside a call at once.
#[derive(Debug, Default)]
pub(crate) struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockClient {
    username: String,
    suspended: bool,
    panics: bool,
    validity: Mutex<Script>,
    actions: Mutex<HashMap<&'static str, Script>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
    gauge: Option<Arc<Gauge>>,
}

impl MockClient {
    /// Valid account whose every action succeeds.
    pub(crate) fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            suspended: false,
            panics: false,
            validity: Mutex::new(Script::always(ActionResult::ok())),
            actions: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            gauge: None,
        }
    }

    pub(crate) fn suspended(mut self) -> Self {
        self.suspended = true;
        self
    }

    /// `is_valid` panics, standing in for a crashed unit.
    pub(crate) fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub(crate) fn validity(self, queue: Vec<ActionResult>, fallback: ActionResult) -> Self {
        *self.validity.lock().unwrap() = Script {
            queue: queue.into(),
            fallback,
        };
        self
    }

    /// Script one method (`"follow"`, `"tweet"`, ...).
    pub(crate) fn script(
        self,
        method: &'static str,
        queue: Vec<ActionResult>,
        fallback: ActionResult,
    ) -> Self {
        self.actions.lock().unwrap().insert(
            method,
            Script {
                queue: queue.into(),
                fallback,
            },
        );
        self
    }

    pub(crate) fn always(self, method: &'static str, result: ActionResult) -> Self {
        self.script(method, Vec::new(), result)
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    /// Calls so far as `"method:arg"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        let prefix = format!("{method}:");
        self.calls()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    async fn hit(&self, method: &'static str, arg: &str) -> ActionResult {
        self.calls.lock().unwrap().push(format!("{method}:{arg}"));
        let _guard = self.gauge.as_deref().map(Gauge::enter);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut actions = self.actions.lock().unwrap();
        match actions.get_mut(method) {
            Some(script) => script.next(),
            None => ActionResult::ok(),
        }
    }
}

impl AccountClient for MockClient {
    fn is_valid(&self) -> BoxFuture<'_, (AccountInfo, ActionResult)> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("is_valid:".into());
            if self.panics {
                panic!("validity check crashed");
            }
            let _guard = self.gauge.as_deref().map(Gauge::enter);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = self.validity.lock().unwrap().next();
            let info = AccountInfo {
                username: self.username.clone(),
                suspended: self.suspended,
            };
            (info, result)
        })
    }

    fn follow<'a>(&'a self, username: &'a str) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("follow", username))
    }

    fn unfollow<'a>(&'a self, username: &'a str) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("unfollow", username))
    }

    fn like<'a>(&'a self, tweet_link: &'a str) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("like", tweet_link))
    }

    fn retweet<'a>(&'a self, tweet_link: &'a str) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("retweet", tweet_link))
    }

    fn tweet<'a>(&'a self, text: &'a str, _options: TweetOptions) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("tweet", text))
    }

    fn comment<'a>(
        &'a self,
        _text: &'a str,
        tweet_link: &'a str,
        _media_base64: Option<String>,
    ) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("comment", tweet_link))
    }

    fn vote_poll<'a>(&'a self, poll_link: &'a str, _choice: &'a str) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("vote_poll", poll_link))
    }

    fn change_profile<'a>(
        &'a self,
        field: ProfileField,
        _value: &'a str,
    ) -> BoxFuture<'a, ActionResult> {
        Box::pin(self.hit("change_profile", field.label()))
    }
}

/// Factory handing out pre-built clients keyed by auth token.
#[derive(Default)]
pub(crate) struct MockFactory {
    clients: HashMap<String, Arc<MockClient>>,
    refuse: HashSet<String>,
    connects: AtomicUsize,
}

impl MockFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn client(mut self, token: &str, client: MockClient) -> Self {
        self.clients.insert(token.to_string(), Arc::new(client));
        self
    }

    /// `connect` fails for this token.
    pub(crate) fn refuse(mut self, token: &str) -> Self {
        self.refuse.insert(token.to_string());
        self
    }

    pub(crate) fn get(&self, token: &str) -> Arc<MockClient> {
        self.clients[token].clone()
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ClientFactory for MockFactory {
    fn connect<'a>(
        &'a self,
        account: &'a Account,
    ) -> BoxFuture<'a, account_client::Result<Arc<dyn AccountClient>>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let token = account.auth_token.expose();
            if self.refuse.contains(token) {
                return Err(account_client::Error::InvalidProxy(
                    "connection refused".into(),
                ));
            }
            match self.clients.get(token) {
                Some(client) => Ok(client.clone() as Arc<dyn AccountClient>),
                None => Err(account_client::Error::InvalidCredentials(
                    "unknown token".into(),
                )),
            }
        })
    }
}

/// Settings with every pause zeroed.
pub(crate) fn fast_settings(threads: usize, retries: u32) -> RunSettings {
    RunSettings {
        threads,
        retries,
        pause_between_retries: Range::ZERO,
        pause_between_accounts: Range::ZERO,
    }
}

/// `tok{i}` accounts with empty usernames.
pub(crate) fn accounts(count: usize) -> Vec<Account> {
    (0..count)
        .map(|i| Account::new(format!("tok{i}"), ""))
        .collect()
}

pub(crate) fn context(
    settings: RunSettings,
    factory: Arc<MockFactory>,
    store: Arc<MemoryAccountStore>,
) -> RunContext {
    RunContext::new(settings, factory, store)
}
