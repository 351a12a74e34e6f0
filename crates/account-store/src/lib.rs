//! Durable account table
//!
//! The orchestrator reads a slice of accounts at start-up and writes back
//! `username`/`status` at fixed checkpoints through `AccountStore::update`,
//! keyed by auth token. Backends are swappable:
//!
//! - `JsonAccountStore`: JSON file, one lock serialising every
//!   read-modify-write, atomic temp-file + rename writes
//! - `MemoryAccountStore`: in-process table that also records every update

pub mod error;
pub mod json;
pub mod memory;

pub use error::{Error, Result};
pub use json::JsonAccountStore;
pub use memory::MemoryAccountStore;

use common::AccountStatus;
use std::future::Future;
use std::pin::Pin;

/// Boxed future so `AccountStore` stays dyn-compatible.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fields to overwrite on one account row. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub status: Option<AccountStatus>,
}

impl AccountUpdate {
    pub fn status(status: AccountStatus) -> Self {
        Self {
            username: None,
            status: Some(status),
        }
    }

    /// Sets the username unless it is empty.
    pub fn with_username(mut self, username: &str) -> Self {
        if !username.is_empty() {
            self.username = Some(username.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.status.is_none()
    }
}

/// Persistence boundary for account rows.
pub trait AccountStore: Send + Sync {
    /// All accounts in table order.
    fn load(&self) -> BoxFuture<'_, Result<Vec<common::Account>>>;

    /// Overwrite the given fields on the row whose auth token matches.
    fn update<'a>(&'a self, auth_token: &'a str, update: AccountUpdate)
    -> BoxFuture<'a, Result<()>>;
}
