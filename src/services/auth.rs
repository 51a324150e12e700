// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Identity service client.
//!
//! Owns every call to the identity service and is the sole writer of the
//! stored token pair. Handles:
//! - Credential and Google sign-in, registration, OTP flows
//! - Token refresh and the forced local logout on refresh failure
//! - Role gating before any token is persisted

use crate::config::Config;
use crate::error::{PortalError, Result};
use crate::models::auth::{
    AuthResponse, ConfirmSignupRequest, GoogleLoginRequest, LoginRequest, OtpRequest, OtpStatus,
    OtpVerification, RefreshRequest, RegisterRequest, VerifyOtpRequest,
};
use crate::services::wire;
use crate::store::TokenStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use validator::Validate;

/// Identity service client.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    google_client_id: String,
    store: TokenStore,
}

impl AuthClient {
    pub fn new(config: &Config, store: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                PortalError::Internal(anyhow::anyhow!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.auth_base_url.trim_end_matches('/').to_string(),
            google_client_id: config.google_client_id.clone(),
            store,
        })
    }

    /// Sign in with email and password.
    ///
    /// The role gate runs before any token is written, so a rejected
    /// account never leaves a stored session behind.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.post_json("/login", &body).await?;
        self.establish_session(response, true)
    }

    /// Create a new account. New accounts receive a default role from the
    /// backend, so the allow-list is not enforced here.
    pub async fn register(&self, payload: &RegisterRequest) -> Result<AuthResponse> {
        payload
            .validate()
            .map_err(|e| PortalError::BadRequest(e.to_string()))?;
        let response = self.post_json("/register", payload).await?;
        self.establish_session(response, false)
    }

    /// Exchange an externally obtained Google identity token for a portal
    /// session. Same role gate and persistence contract as [`login`].
    ///
    /// [`login`]: AuthClient::login
    pub async fn login_with_google(&self, id_token: &str) -> Result<AuthResponse> {
        let body = GoogleLoginRequest {
            id_token: id_token.to_string(),
            client_id: self.google_client_id.clone(),
        };
        let response = self.post_json("/mobile/google", &body).await?;
        self.establish_session(response, true)
    }

    pub async fn send_otp(&self, email: &str) -> Result<OtpStatus> {
        let body = OtpRequest {
            email: email.to_string(),
        };
        self.post_json("/send-otp", &body).await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<OtpVerification> {
        let body = VerifyOtpRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        self.post_json("/verify-otp", &body).await
    }

    pub async fn confirm_signup(&self, payload: &ConfirmSignupRequest) -> Result<OtpStatus> {
        self.post_json("/register/confirm", payload).await
    }

    /// Clear the local session. Never fails; storage problems are logged
    /// inside the store. Safe to call when already signed out.
    pub fn logout(&self) {
        self.store.clear_tokens();
        self.store.clear_cached_user();
        tracing::info!("Local session cleared");
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Fails with `NoRefreshToken` (without touching the network) when no
    /// refresh token is stored. Every failure path clears the stored
    /// session first, so the system never holds a half-valid pair.
    pub async fn refresh_token(&self) -> Result<AuthResponse> {
        let refresh_token = match self.store.refresh_token() {
            Some(token) => token,
            None => {
                self.logout();
                return Err(PortalError::NoRefreshToken);
            }
        };

        let body = RefreshRequest { refresh_token };
        match self.post_json::<_, AuthResponse>("/refresh", &body).await {
            Ok(response) => {
                self.store.set_token_pair(&response.tokens);
                if let Some(user) = &response.user {
                    self.store.set_cached_user(user);
                }
                tracing::debug!("Access token refreshed");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing session");
                self.logout();
                Err(e)
            }
        }
    }

    // ─── Read-only accessors ─────────────────────────────────────────────

    pub fn stored_access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    pub fn stored_refresh_token(&self) -> Option<String> {
        self.store.refresh_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.access_token().is_some()
    }

    // ─── Internals ───────────────────────────────────────────────────────

    /// Validate and persist a fresh auth response.
    fn establish_session(&self, response: AuthResponse, enforce_role: bool) -> Result<AuthResponse> {
        let user = response
            .user
            .as_ref()
            .ok_or_else(|| PortalError::InvalidResponse("auth response has no user".to_string()))?;

        if enforce_role && !user.role.is_allowed() {
            tracing::warn!(role = %user.role.name, "Rejected sign-in for disallowed role");
            return Err(PortalError::AccessDenied);
        }

        self.store.set_token_pair(&response.tokens);
        self.store.set_cached_user(user);
        tracing::info!(user_id = user.id, "Session established");
        Ok(response)
    }

    /// POST with the identity service's response conventions: unwrap the
    /// optional envelope on success, prefer the body message on failure.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(PortalError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = wire::error_message(status, &body);
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                message = %message,
                "Identity service error"
            );
            return Err(PortalError::AuthService {
                status: status.as_u16(),
                message,
            });
        }

        let value = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PortalError::InvalidResponse(format!("JSON parse error: {}", e)))?;
        wire::decode_body(value)
    }
}
