//! JSON-file account table
//!
//! The file holds an array of rows in table order. Every read-modify-write
//! (find row by auth token, set fields, save) runs under one tokio Mutex, so
//! concurrent workers serialise on it. Writes go to a temp file that is then
//! renamed over the target.

use std::path::{Path, PathBuf};

use common::{Account, AccountStatus, Secret};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::{AccountStore, AccountUpdate, BoxFuture};

/// One persisted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub auth_token: String,
    #[serde(default)]
    pub proxy: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub status: AccountStatus,
}

impl From<&AccountRecord> for Account {
    fn from(record: &AccountRecord) -> Self {
        Account {
            auth_token: Secret::new(record.auth_token.clone()),
            proxy: record.proxy.clone(),
            username: record.username.clone(),
            status: record.status,
        }
    }
}

/// File-backed account table.
pub struct JsonAccountStore {
    path: PathBuf,
    rows: Mutex<Vec<AccountRecord>>,
}

impl JsonAccountStore {
    /// Open the table at `path`.
    ///
    /// A missing file is created as `[]`. Rows with an empty auth token are
    /// skipped.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let rows = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading account table: {e}")))?;
            let rows: Vec<AccountRecord> = serde_json::from_str(&contents)
                .map_err(|e| Error::Parse(format!("parsing account table: {e}")))?;
            let rows: Vec<AccountRecord> = rows
                .into_iter()
                .filter(|r| !r.auth_token.trim().is_empty())
                .collect();
            info!(path = %path.display(), accounts = rows.len(), "loaded account table");
            rows
        } else {
            info!(path = %path.display(), "account table not found, starting empty");
            let rows = Vec::new();
            write_atomic(&path, &rows).await?;
            rows
        };

        Ok(Self {
            path,
            rows: Mutex::new(rows),
        })
    }
}

impl AccountStore for JsonAccountStore {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Account>>> {
        Box::pin(async move {
            let rows = self.rows.lock().await;
            Ok(rows.iter().map(Account::from).collect())
        })
    }

    fn update<'a>(
        &'a self,
        auth_token: &'a str,
        update: AccountUpdate,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut rows = self.rows.lock().await;
            let row = rows
                .iter_mut()
                .find(|r| r.auth_token == auth_token)
                .ok_or_else(|| {
                    Error::NotFound(Secret::new(auth_token.to_string()).hint())
                })?;
            if let Some(username) = update.username {
                row.username = username;
            }
            if let Some(status) = update.status {
                row.status = status;
            }
            debug!(status = %row.status, username = %row.username, "updated account row");
            write_atomic(&self.path, &rows).await
        })
    }
}

/// Write the table atomically.
///
/// Writes to a temporary file in the same directory, then renames it over the
/// target. Permissions are 0600 since the rows hold auth tokens.
async fn write_atomic(path: &Path, rows: &[AccountRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows)
        .map_err(|e| Error::Parse(format!("serializing account table: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("account table path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".accounts.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp account table: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting account table permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp account table: {e}")))?;

    debug!(path = %path.display(), "persisted account table");
    Ok(())
}
