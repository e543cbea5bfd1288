use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::AuthError;

/// Tokens count as expired this long before their real expiry.
pub const EXPIRY_BUFFER_MS: i64 = 5 * 60 * 1000;

pub const TOKEN_FILE: &str = "tokens.b64";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Absolute expiry in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenSet {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            token_type: None,
            scope: None,
            expires_at: None,
        }
    }

    /// Derives `expires_at` from `expires_in` relative to `now`.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.expires_at = self
            .expires_in
            .map(|secs| now.timestamp_millis().saturating_add(secs.saturating_mul(1000)));
        self
    }

    /// A token without a known expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now.timestamp_millis() >= at.saturating_sub(EXPIRY_BUFFER_MS),
            None => false,
        }
    }
}

pub fn encode_tokens(tokens: &TokenSet) -> Result<String, AuthError> {
    let json = serde_json::to_vec(tokens).map_err(|e| AuthError::Storage(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

pub fn decode_tokens(blob: &str) -> Result<TokenSet, AuthError> {
    let bytes = STANDARD
        .decode(blob.trim())
        .map_err(|e| AuthError::Decode(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::Decode(e.to_string()))
}

/// Persistence for the current token set. Implementations hold a single
/// encoded blob; a blob that fails to decode is discarded on load.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenSet>, AuthError>;

    fn save(&self, tokens: &TokenSet) -> Result<(), AuthError>;

    fn clear(&self) -> Result<(), AuthError>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    blob: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a raw blob, as if written by another process.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenSet>, AuthError> {
        let mut guard = self.blob.lock();
        let Some(blob) = guard.as_deref() else {
            return Ok(None);
        };
        match decode_tokens(blob) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(err) => {
                warn!(error = %err, "discarding corrupt token blob");
                *guard = None;
                Ok(None)
            }
        }
    }

    fn save(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        let blob = encode_tokens(tokens)?;
        *self.blob.lock() = Some(blob);
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.blob.lock() = None;
        Ok(())
    }
}

/// Token blob kept in a file under the data directory.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove_file(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(format!(
                "failed to remove {}: {err}",
                self.path.display()
            ))),
        }
    }
}

impl TokenStore for FileTokenStore {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<TokenSet>, AuthError> {
        let _guard = self.lock.lock();
        let blob = match fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AuthError::Storage(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )));
            }
        };
        if blob.trim().is_empty() {
            return Ok(None);
        }
        match decode_tokens(&blob) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(err) => {
                warn!(error = %err, "discarding corrupt token file");
                self.remove_file()?;
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self, tokens), fields(path = %self.path.display()))]
    fn save(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        let blob = encode_tokens(tokens)?;
        let _guard = self.lock.lock();
        let storage = |e: std::io::Error| AuthError::Storage(format!("{}: {e}", self.path.display()));

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(storage)?;
        let mut temp = NamedTempFile::new_in(dir).map_err(storage)?;
        temp.write_all(blob.as_bytes()).map_err(storage)?;
        temp.flush().map_err(storage)?;
        temp.persist(&self.path).map_err(|e| storage(e.error))?;
        debug!("saved tokens");
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let _guard = self.lock.lock();
        self.remove_file()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn expiry_uses_five_minute_buffer() {
        let mut tokens = TokenSet::bearer("a");
        tokens.expires_in = Some(3600);
        let tokens = tokens.stamped(now());
        assert!(!tokens.is_expired(now()));
        assert!(!tokens.is_expired(now() + Duration::minutes(54)));
        assert!(tokens.is_expired(now() + Duration::minutes(55)));
        assert!(!TokenSet::bearer("b").is_expired(now() + Duration::days(365)));
    }

    #[test]
    fn memory_store_discards_corrupt_blob() {
        let store = MemoryTokenStore::with_blob("%%% not base64");
        assert_eq!(store.load().unwrap(), None);

        let tokens = TokenSet::bearer("abc");
        store.save(&tokens).unwrap();
        assert_eq!(store.load().unwrap(), Some(tokens));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), None);

        let mut tokens = TokenSet::bearer("abc");
        tokens.refresh_token = Some("r1".to_string());
        store.save(&tokens).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(decode_tokens(&raw).unwrap(), tokens);
        assert_eq!(FileTokenStore::in_dir(dir.path()).load().unwrap(), Some(tokens));

        fs::write(store.path(), "e30=garbage").unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert!(!store.path().exists());
        store.clear().unwrap();
    }
}
