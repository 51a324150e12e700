// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Shared response decoding for the identity and business API clients.
//!
//! Both services may wrap payloads as `{success, message, data}`; the
//! payload is under `data` when that key is present and non-null,
//! otherwise the body itself is the payload.

use crate::error::{PortalError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Unwrap the optional response envelope and deserialize the payload.
pub(crate) fn decode_body<T: DeserializeOwned>(mut body: Value) -> Result<T> {
    let payload = if body.get("data").is_some_and(|d| !d.is_null()) {
        body["data"].take()
    } else {
        body
    };
    serde_json::from_value(payload).map_err(|e| PortalError::InvalidResponse(e.to_string()))
}

/// Best human-readable message for an error response: the body's `message`
/// field when present, else the transport status line.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
