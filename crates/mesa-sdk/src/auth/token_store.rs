//! Persistent storage for the token record
//!
//! The record survives process restarts as a single JSON document under the
//! platform data directory. The on-disk layout carries exactly the four
//! token fields; all-null fields (or a missing file) represent the empty
//! state.

use super::types::{AuthError, AuthResult, TokenPair};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

/// On-disk token record. Nullable fields so an empty record is representable.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRecord {
    access: Option<String>,
    refresh: Option<String>,
    access_expiry: Option<u64>,
    refresh_expiry: Option<u64>,
}

impl StoredRecord {
    fn into_pair(self) -> Option<TokenPair> {
        // A usable record needs all four fields; anything partial reads as empty.
        Some(TokenPair {
            access: self.access?,
            refresh: self.refresh?,
            access_expiry: self.access_expiry?,
            refresh_expiry: self.refresh_expiry?,
        })
    }
}

impl From<&TokenPair> for StoredRecord {
    fn from(pair: &TokenPair) -> Self {
        Self {
            access: Some(pair.access.clone()),
            refresh: Some(pair.refresh.clone()),
            access_expiry: Some(pair.access_expiry),
            refresh_expiry: Some(pair.refresh_expiry),
        }
    }
}

/// File-backed store for the persisted token record
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store rooted at the given data directory
    pub fn new(data_dir: PathBuf) -> AuthResult<Self> {
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            AuthError::StorageError(format!(
                "failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        Ok(Self {
            path: data_dir.join(mesa_common::TOKEN_STORE_FILE),
        })
    }

    /// Load the persisted record.
    ///
    /// A missing file or an unreadable document degrades to the empty
    /// record; storage problems must never lock a user out of re-login.
    pub async fn load(&self) -> AuthResult<Option<TokenPair>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AuthError::StorageError(format!(
                    "failed to read token store: {err}"
                )))
            }
        };

        match serde_json::from_str::<StoredRecord>(&contents) {
            Ok(record) => Ok(record.into_pair()),
            Err(err) => {
                warn!("corrupted token store, treating as empty: {err}");
                Ok(None)
            }
        }
    }

    /// Persist a token record, replacing any previous one
    pub async fn store(&self, pair: &TokenPair) -> AuthResult<()> {
        let contents = serde_json::to_string_pretty(&StoredRecord::from(pair))?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|e| AuthError::StorageError(format!("failed to write token store: {e}")))?;

        // Token material is secret; keep the file owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(err) = tokio::fs::set_permissions(&self.path, perms).await {
                warn!("failed to restrict token store permissions: {err}");
            }
        }

        Ok(())
    }

    /// Delete the persisted record; idempotent
    pub async fn clear(&self) -> AuthResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::StorageError(format!(
                "failed to clear token store: {err}"
            ))),
        }
    }
}
