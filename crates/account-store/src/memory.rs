//! In-memory account table

use common::{Account, Secret};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::{AccountStore, AccountUpdate, BoxFuture};

/// Account table held in memory.
///
/// Every applied update is also appended to a log, in application order, so
/// callers can inspect the checkpoints a run wrote.
#[derive(Default)]
pub struct MemoryAccountStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    accounts: Vec<Account>,
    log: Vec<(String, AccountUpdate)>,
}

impl MemoryAccountStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                accounts,
                log: Vec::new(),
            }),
        }
    }

    /// Current row for a token.
    pub async fn get(&self, auth_token: &str) -> Option<Account> {
        let inner = self.inner.lock().await;
        inner
            .accounts
            .iter()
            .find(|a| a.auth_token.expose() == auth_token)
            .cloned()
    }

    /// Updates applied so far, keyed by auth token.
    pub async fn updates(&self) -> Vec<(String, AccountUpdate)> {
        self.inner.lock().await.log.clone()
    }
}

impl AccountStore for MemoryAccountStore {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Account>>> {
        Box::pin(async move { Ok(self.inner.lock().await.accounts.clone()) })
    }

    fn update<'a>(
        &'a self,
        auth_token: &'a str,
        update: AccountUpdate,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().await;
            let account = inner
                .accounts
                .iter_mut()
                .find(|a| a.auth_token.expose() == auth_token)
                .ok_or_else(|| Error::NotFound(Secret::new(auth_token.to_string()).hint()))?;
            if let Some(username) = &update.username {
                account.username = username.clone();
            }
            if let Some(status) = update.status {
                account.status = status;
            }
            inner.log.push((auth_token.to_string(), update));
            Ok(())
        })
    }
}
