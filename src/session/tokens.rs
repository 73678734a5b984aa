//! Cookie-like token jar and session-token derivation
//!
//! The primary auth cookie `token` is written by the login flow. The realtime
//! connection registers with a separate `ws_token` cookie that is copied from
//! the primary token the first time it is needed and expires after one day,
//! independently of the primary cookie's lifecycle.

use crate::error::{Result, TextdataError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Primary auth cookie
pub const PRIMARY_TOKEN_KEY: &str = "token";

/// Realtime session cookie
pub const SESSION_TOKEN_KEY: &str = "ws_token";

/// Lifetime of a derived session token
pub const SESSION_TOKEN_TTL_DAYS: i64 = 1;

/// A stored cookie value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieEntry {
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CookieEntry {
    pub fn session(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn expiring(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Persistent key/value storage for cookies
pub trait TokenStore: Send {
    fn get(&self, key: &str) -> Option<CookieEntry>;
    fn set(&mut self, key: &str, entry: CookieEntry) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory jar (tests, ephemeral CLI runs)
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: HashMap<String, CookieEntry>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<CookieEntry> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, entry: CookieEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON-file backed jar; every mutation is written through
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: HashMap<String, CookieEntry>,
}

impl FileTokenStore {
    /// Open the jar at `path`, starting empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            HashMap::new()
        };

        debug!(
            "Token jar opened: {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<CookieEntry> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, entry: CookieEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Shared access to the token jar
///
/// The lock is held across every read-modify-write, so the open path
/// (derive) and the close path (clear) never interleave.
pub struct SessionTokens {
    store: Mutex<Box<dyn TokenStore>>,
}

impl SessionTokens {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    /// Jar kept in memory only
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn TokenStore>>> {
        self.store
            .lock()
            .map_err(|_| TextdataError::Session("token jar lock poisoned".to_string()))
    }

    fn live_value(store: &dyn TokenStore, key: &str, now: DateTime<Utc>) -> Option<String> {
        store
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value)
    }

    /// Current primary auth token
    pub fn primary(&self) -> Option<String> {
        let store = self.lock().ok()?;
        Self::live_value(&**store, PRIMARY_TOKEN_KEY, Utc::now())
    }

    /// Store the primary auth token (login)
    pub fn set_primary(&self, token: &str, expires_at: Option<DateTime<Utc>>) -> Result<()> {
        let entry = CookieEntry {
            value: token.to_string(),
            expires_at,
        };
        self.lock()?.set(PRIMARY_TOKEN_KEY, entry)
    }

    /// Remove the primary auth token (logout)
    pub fn clear_primary(&self) -> Result<()> {
        self.lock()?.remove(PRIMARY_TOKEN_KEY)
    }

    /// Current session token, if one was derived and has not expired
    pub fn session_token(&self) -> Option<String> {
        let store = self.lock().ok()?;
        Self::live_value(&**store, SESSION_TOKEN_KEY, Utc::now())
    }

    /// Session token for registration, derived from `primary` if none is stored
    pub fn derive_ws_token(&self, primary: &str) -> Result<String> {
        self.derive_ws_token_at(primary, Utc::now())
    }

    pub fn derive_ws_token_at(&self, primary: &str, now: DateTime<Utc>) -> Result<String> {
        let mut store = self.lock()?;

        if let Some(existing) = Self::live_value(&**store, SESSION_TOKEN_KEY, now) {
            debug!("Reusing stored session token");
            return Ok(existing);
        }

        let expires_at = now + Duration::days(SESSION_TOKEN_TTL_DAYS);
        store.set(
            SESSION_TOKEN_KEY,
            CookieEntry::expiring(primary, expires_at),
        )?;
        info!("Derived session token (expires {})", expires_at);

        Ok(primary.to_string())
    }

    /// Remove the session token
    pub fn clear_ws_token(&self) -> Result<()> {
        self.lock()?.remove(SESSION_TOKEN_KEY)
    }
}

impl std::fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokens").finish_non_exhaustive()
    }
}
