// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Services module - identity and business API clients.

pub mod api;
pub mod auth;
pub mod portal;
pub(crate) mod wire;

pub use api::ApiClient;
pub use auth::AuthClient;
pub use portal::PortalService;
