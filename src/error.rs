// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Application error types shared across the portal core.

/// Error type surfaced by every client and the session layer.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Access denied: account role is not permitted to use the portal")]
    AccessDenied,

    #[error("Invalid response from the authentication service: {0}")]
    InvalidResponse(String),

    #[error("No refresh token stored")]
    NoRefreshToken,

    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("You do not have permission to perform this action")]
    PermissionDenied,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication service error ({status}): {message}")]
    AuthService { status: u16, message: String },

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    /// Map a transport-level failure (connect, timeout, TLS) from the HTTP
    /// client. Status-level failures are mapped at the call site instead.
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        PortalError::NetworkUnreachable(err.to_string())
    }

    /// True for failures that mean the backend could not be reached at all,
    /// as opposed to the backend rejecting the request.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PortalError::NetworkUnreachable(_))
    }
}

/// Result type alias for the portal core.
pub type Result<T> = std::result::Result<T, PortalError>;
