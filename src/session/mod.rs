// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Application session state machine.
//!
//! The single source of truth for "is someone signed in and who are they",
//! consumed by the UI layer and the route guard. Constructed once per
//! application and passed by reference to consumers; there is no ambient
//! singleton.

pub mod guard;

pub use guard::{evaluate_route, RouteAccess, RouteDecision};

use crate::error::{PortalError, Result};
use crate::models::auth::AuthResponse;
use crate::models::User;
use crate::services::{ApiClient, AuthClient, PortalService};
use crate::store::TokenStore;
use std::sync::{Arc, RwLock};

/// Authentication state visible to the UI layer.
///
/// Exactly one of `Authenticated`/`Anonymous` holds once the startup
/// restore completes; `Checking` is only ever observed before that.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Startup restore is still running.
    Checking,
    Authenticated(User),
    Anonymous,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Session manager owning the current user and authentication state.
#[derive(Clone)]
pub struct SessionManager {
    auth: Arc<AuthClient>,
    portal: PortalService,
    store: TokenStore,
    state: Arc<RwLock<SessionState>>,
}

fn set_state(lock: &RwLock<SessionState>, next: SessionState) {
    *lock.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
}

impl SessionManager {
    /// Build the manager and start listening for teardown signals from the
    /// HTTP pipeline: a failed refresh clears the stored session, and this
    /// listener drops the in-memory user to match.
    ///
    /// Must be constructed inside a Tokio runtime.
    pub fn new(
        auth: Arc<AuthClient>,
        portal: PortalService,
        api: &ApiClient,
        store: TokenStore,
    ) -> Self {
        let state = Arc::new(RwLock::new(SessionState::Checking));

        let mut expiry = api.subscribe_expiry();
        let listener_state = Arc::clone(&state);
        tokio::spawn(async move {
            while expiry.changed().await.is_ok() {
                tracing::warn!("Session torn down after failed refresh");
                set_state(&listener_state, SessionState::Anonymous);
            }
        });

        Self {
            auth,
            portal,
            store,
            state,
        }
    }

    /// Restore the session from stored credentials.
    ///
    /// With no stored token this resolves to `Anonymous` without touching
    /// the network. With one, the profile endpoint decides: the pipeline
    /// transparently absorbs a single 401-refresh-retry, so a stale access
    /// token with a live refresh token still restores. An unreachable
    /// backend falls back to the cached profile when one exists.
    pub async fn initialize(&self) {
        if self.auth.stored_access_token().is_none() {
            set_state(&self.state, SessionState::Anonymous);
            return;
        }

        match self.portal.get_profile().await {
            Ok(user) => {
                self.store.set_cached_user(&user);
                tracing::info!(user_id = user.id, "Session restored");
                set_state(&self.state, SessionState::Authenticated(user));
            }
            Err(e) if e.is_network_error() => match self.store.cached_user() {
                Some(cached) => {
                    tracing::warn!(
                        error = %e,
                        "Profile endpoint unreachable, restoring cached profile"
                    );
                    set_state(&self.state, SessionState::Authenticated(cached));
                }
                None => {
                    tracing::warn!(
                        error = %e,
                        "Profile endpoint unreachable and no cached profile"
                    );
                    self.auth.logout();
                    set_state(&self.state, SessionState::Anonymous);
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed");
                self.auth.logout();
                set_state(&self.state, SessionState::Anonymous);
            }
        }
    }

    /// Enter the authenticated state from a fresh auth response.
    ///
    /// The optimistic user from the response becomes visible immediately;
    /// the authoritative profile overwrites it when the follow-up fetch
    /// succeeds. A failed follow-up fetch never fails the login.
    pub async fn login(&self, response: AuthResponse) -> Result<User> {
        let user = response
            .user
            .ok_or_else(|| PortalError::InvalidResponse("auth response has no user".to_string()))?;

        self.store.set_cached_user(&user);
        set_state(&self.state, SessionState::Authenticated(user.clone()));

        match self.portal.get_profile().await {
            Ok(full) => {
                self.store.set_cached_user(&full);
                set_state(&self.state, SessionState::Authenticated(full.clone()));
                Ok(full)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Profile fetch after login failed, keeping optimistic user"
                );
                Ok(user)
            }
        }
    }

    /// Re-fetch the authoritative profile and overwrite the current user.
    /// A transient failure propagates to the caller without touching the
    /// authentication state.
    pub async fn refresh_user(&self) -> Result<User> {
        let user = self.portal.get_profile().await?;
        self.store.set_cached_user(&user);
        set_state(&self.state, SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Leave the authenticated state. Safe to call when already signed out.
    pub fn logout(&self) {
        self.auth.logout();
        set_state(&self.state, SessionState::Anonymous);
        tracing::info!("Signed out");
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user().cloned()
    }
}
