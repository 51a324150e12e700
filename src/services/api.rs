// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Authenticated HTTP pipeline for the business API.
//!
//! Every outbound business call passes through this client. The request
//! hook attaches the stored bearer token unless the path is public; the
//! response hook dispatches on status. A 401 triggers the single-flight
//! refresh protocol: concurrent failures share one refresh call, and each
//! request is retried at most once.

use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::services::auth::AuthClient;
use crate::services::wire;
use crate::store::TokenStore;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Outcome shared between every caller waiting on one refresh cycle.
/// The error carries only the message; each caller surfaces `SessionExpired`.
type SharedRefresh = Shared<BoxFuture<'static, std::result::Result<String, String>>>;

/// Business API client with bearer-token attachment and coordinated
/// 401 recovery.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<AuthClient>,
    store: TokenStore,
    public_paths: Vec<String>,
    /// Slot holding the in-flight refresh all concurrent 401 callers share.
    refresh_inflight: Arc<Mutex<Option<SharedRefresh>>>,
    /// Fired when a refresh cycle fails and the stored session is gone.
    expired_tx: watch::Sender<()>,
}

impl ApiClient {
    pub fn new(config: &Config, auth: Arc<AuthClient>, store: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                PortalError::Internal(anyhow::anyhow!("failed to build HTTP client: {}", e))
            })?;

        let (expired_tx, _) = watch::channel(());

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth,
            store,
            public_paths: config.public_paths.clone(),
            refresh_inflight: Arc::new(Mutex::new(None)),
            expired_tx,
        })
    }

    /// Subscribe to session-teardown notifications. The session layer
    /// listens here to drop the in-memory user after a failed refresh.
    pub fn subscribe_expiry(&self) -> watch::Receiver<()> {
        self.expired_tx.subscribe()
    }

    // ─── JSON surface ────────────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = Self::to_value(body)?;
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = Self::to_value(body)?;
        let response = self.send(Method::PUT, path, Some(body)).await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Fetch `path` as an opaque blob and save it to `destination`.
    ///
    /// Same auth and retry pipeline as the JSON calls; the body is never
    /// inspected.
    pub async fn download(&self, path: &str, destination: &Path) -> Result<()> {
        let response = self.send(Method::GET, path, None).await?;
        let bytes = response.bytes().await.map_err(PortalError::transport)?;
        tokio::fs::write(destination, &bytes).await.map_err(|e| {
            PortalError::Internal(anyhow::anyhow!(
                "failed to save download to {}: {}",
                destination.display(),
                e
            ))
        })?;
        tracing::info!(
            path = %path,
            destination = %destination.display(),
            size = bytes.len(),
            "Download saved"
        );
        Ok(())
    }

    // ─── Pipeline ────────────────────────────────────────────────────────

    /// Run one request through the full pipeline. Returns a response whose
    /// status has already been dispatched; only successes come back `Ok`.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let public = self.is_public(path);
        let url = format!("{}{}", self.base_url, path);
        let token = if public { None } else { self.store.access_token() };

        let response = self
            .dispatch(&method, &url, body.as_ref(), token.as_deref())
            .await?;

        if response.status() != reqwest::StatusCode::UNAUTHORIZED || public {
            return self.check(&method, &url, response).await;
        }

        // One retry per request: a 401 on the retried call falls through to
        // the status table below, never into a second refresh cycle.
        let fresh = self.refreshed_access_token(token.as_deref()).await?;
        let retried = self
            .dispatch(&method, &url, body.as_ref(), Some(&fresh))
            .await?;
        self.check(&method, &url, retried).await
    }

    fn is_public(&self, path: &str) -> bool {
        self.public_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    async fn dispatch(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(PortalError::transport)
    }

    /// Status dispatch table for everything except the first 401.
    async fn check(
        &self,
        method: &Method,
        url: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(PortalError::PermissionDenied);
        }

        let body = response.text().await.unwrap_or_default();
        let message = wire::error_message(status, &body);
        if status.is_server_error() {
            tracing::error!(
                url = %url,
                method = %method,
                status = status.as_u16(),
                body = %body,
                "Backend server error"
            );
        }
        Err(PortalError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    /// Get an access token newer than the one a failing request used,
    /// running at most one refresh cycle regardless of how many requests
    /// hit a 401 concurrently.
    ///
    /// The first caller installs a shared refresh future in the slot; every
    /// concurrent caller clones and awaits the same handle, so the identity
    /// service sees exactly one refresh call per expiry. Only the installer
    /// clears the slot, after the outcome is known.
    async fn refreshed_access_token(&self, stale: Option<&str>) -> Result<String> {
        let (handle, installer) = {
            let mut slot = self.refresh_inflight.lock().await;
            match slot.as_ref() {
                Some(handle) => (handle.clone(), false),
                None => {
                    // No refresh running. If the stored token already moved
                    // past the one this request sent, retry with it directly.
                    if let Some(current) = self.store.access_token() {
                        if stale != Some(current.as_str()) {
                            return Ok(current);
                        }
                    }

                    let auth = Arc::clone(&self.auth);
                    let expired_tx = self.expired_tx.clone();
                    let handle: SharedRefresh = async move {
                        match auth.refresh_token().await {
                            Ok(response) => Ok(response.tokens.access_token),
                            Err(e) => {
                                // The auth client has already torn the
                                // stored session down; tell the session
                                // layer so the in-memory user goes too.
                                let _ = expired_tx.send(());
                                Err(e.to_string())
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    *slot = Some(handle.clone());
                    (handle, true)
                }
            }
        };

        let outcome = handle.await;
        if installer {
            *self.refresh_inflight.lock().await = None;
        }

        outcome.map_err(|message| {
            tracing::warn!(error = %message, "Session refresh failed");
            PortalError::SessionExpired
        })
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn to_value<B: Serialize>(body: &B) -> Result<Value> {
        serde_json::to_value(body).map_err(|e| {
            PortalError::Internal(anyhow::anyhow!("failed to serialize request body: {}", e))
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| PortalError::InvalidResponse(format!("JSON parse error: {}", e)))?;
        wire::decode_body(value)
    }
}
