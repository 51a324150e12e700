// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Jendo Health patient portal - client core.
//!
//! This crate owns the session/token lifecycle and the authenticated
//! request pipeline for the patient-facing portal: sign-in against the
//! identity service, bearer-token attachment with single-flight refresh on
//! expiry, session restore, and the typed surface over the business API.
//! The UI shell builds one [`Portal`] and drives everything through it.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod store;

use config::Config;
use error::Result;
use services::{ApiClient, AuthClient, PortalService};
use session::SessionManager;
use std::sync::Arc;
use store::TokenStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application-scoped wiring of the portal core.
///
/// Constructed once per application instance and passed by reference to
/// consumers. Must be built inside a Tokio runtime.
pub struct Portal {
    pub config: Config,
    pub store: TokenStore,
    pub auth: Arc<AuthClient>,
    pub api: Arc<ApiClient>,
    pub portal: PortalService,
    pub session: SessionManager,
}

impl Portal {
    /// Wire every component from a loaded configuration.
    pub fn new(config: Config) -> Result<Self> {
        let store = TokenStore::open(&config.storage_path);
        Self::with_store(config, store)
    }

    /// Wire with an explicit store; tests pass the in-memory one.
    pub fn with_store(config: Config, store: TokenStore) -> Result<Self> {
        let auth = Arc::new(AuthClient::new(&config, store.clone())?);
        let api = Arc::new(ApiClient::new(&config, Arc::clone(&auth), store.clone())?);
        let portal = PortalService::new(Arc::clone(&api));
        let session = SessionManager::new(Arc::clone(&auth), portal.clone(), &api, store.clone());

        Ok(Self {
            config,
            store,
            auth,
            api,
            portal,
            session,
        })
    }
}

/// Initialize structured JSON logging for the host shell.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("jendo_portal=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
