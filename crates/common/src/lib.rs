//! Common types shared by the bulk-runner crates
//!
//! `Account` and `AccountStatus` are the persisted account row; `Range` is the
//! inclusive `[start, end]` interval used for pauses and follower targets;
//! `Secret` keeps auth tokens out of logs.

mod account;
mod error;
mod range;
mod secret;

pub use account::{Account, AccountStatus};
pub use error::{Error, Result};
pub use range::Range;
pub use secret::Secret;
