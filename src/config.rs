//! Application configuration loaded from environment variables.
//!
//! The portal core is a library; the UI shell loads one `Config` at startup
//! and wires everything from it.

use std::env;
use std::path::PathBuf;

/// Fixed request timeout applied to every outbound call, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity service base URL (login, register, OTP, refresh)
    pub auth_base_url: String,
    /// Business API base URL (profile, doctors, tests, records, wellness)
    pub api_base_url: String,
    /// Path prefixes on the business API that are sent unauthenticated
    pub public_paths: Vec<String>,
    /// Timeout for all outbound requests, in seconds
    pub request_timeout_secs: u64,
    /// Location of the on-disk session store
    pub storage_path: PathBuf,
    /// Google OAuth client ID for the external sign-in flow
    pub google_client_id: String,
}

fn default_public_paths() -> Vec<String> {
    vec!["/wellness".to_string(), "/public".to_string()]
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            auth_base_url: "http://localhost:9090".to_string(),
            api_base_url: "http://localhost:9091".to_string(),
            public_paths: default_public_paths(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage_path: env::temp_dir().join("jendo-portal-session.json"),
            google_client_id: "test-google-client".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            auth_base_url: env::var("JENDO_AUTH_URL")
                .map_err(|_| ConfigError::Missing("JENDO_AUTH_URL"))?,
            api_base_url: env::var("JENDO_API_URL")
                .map_err(|_| ConfigError::Missing("JENDO_API_URL"))?,
            public_paths: env::var("JENDO_PUBLIC_PATHS")
                .map(|raw| {
                    raw.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| default_public_paths()),
            request_timeout_secs: env::var("JENDO_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            storage_path: env::var("JENDO_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".jendo-portal/session.json")),
            google_client_id: env::var("JENDO_GOOGLE_CLIENT_ID").unwrap_or_default(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
