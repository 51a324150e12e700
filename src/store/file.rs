// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! File-backed key-value store for the session credentials.
//!
//! Storage is best-effort: every failure is logged and swallowed, so
//! callers never carry a failure branch for persistence. Values survive a
//! process restart. The file is plain JSON, not encrypted at rest; a
//! production deployment should prefer an OS keychain or an encrypted
//! store.
//!
//! Known limitation: two processes sharing one store file can diverge
//! after one of them rotates the refresh token.

use crate::models::auth::TokenPair;
use crate::models::User;
use crate::store::keys;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Durable key-value store holding the token pair and the cached profile.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// `None` in in-memory mode (tests).
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, String>>,
}

impl TokenStore {
    /// Open the store at `path`, loading any previously persisted entries.
    /// A missing or unreadable file starts the store empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Corrupt session store, starting empty"
                );
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to read session store, starting empty"
                );
                HashMap::new()
            }
        };

        Self {
            inner: Arc::new(StoreInner {
                path: Some(path),
                entries: Mutex::new(entries),
            }),
        }
    }

    /// In-memory store for tests; nothing touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: None,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn set_item(&self, key: &str, value: &str) {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries);
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn delete_item(&self, key: &str) {
        let mut entries = self.entries();
        entries.remove(key);
        self.flush(&entries);
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.clear();
        self.flush(&entries);
    }

    // ─── Typed conveniences ──────────────────────────────────────────────

    pub fn access_token(&self) -> Option<String> {
        self.get_item(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get_item(keys::REFRESH_TOKEN)
    }

    /// Persist a freshly issued pair; both entries are written together.
    pub fn set_token_pair(&self, pair: &TokenPair) {
        let mut entries = self.entries();
        entries.insert(keys::ACCESS_TOKEN.to_string(), pair.access_token.clone());
        entries.insert(keys::REFRESH_TOKEN.to_string(), pair.refresh_token.clone());
        self.flush(&entries);
    }

    /// Remove both tokens together.
    pub fn clear_tokens(&self) {
        let mut entries = self.entries();
        entries.remove(keys::ACCESS_TOKEN);
        entries.remove(keys::REFRESH_TOKEN);
        self.flush(&entries);
    }

    /// Last-known profile, or `None` when absent or unparseable.
    pub fn cached_user(&self) -> Option<User> {
        let raw = self.get_item(keys::USER_PROFILE)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparseable cached profile");
                None
            }
        }
    }

    pub fn set_cached_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.set_item(keys::USER_PROFILE, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize profile for caching"),
        }
    }

    pub fn clear_cached_user(&self) {
        self.delete_item(keys::USER_PROFILE);
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rewrite the backing file. Failures are logged, never surfaced.
    fn flush(&self, entries: &HashMap<String, String>) {
        let Some(path) = &self.inner.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(path, raw) {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "Failed to persist session store"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize session store"),
        }
    }
}
