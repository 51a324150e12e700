// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Route guarding as a pure function of session state.

use super::SessionState;

/// How a view is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Requires an authenticated session (dashboard, bookings, records).
    Protected,
    /// Only reachable signed out (login, register, OTP views).
    PublicOnly,
    /// Reachable regardless of session state.
    Open,
}

/// What the shell should render for a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Restore is still running; render the loading fallback.
    Loading,
    RedirectToLogin,
    RedirectToHome,
}

/// Decide what to render for a view with the given access level.
pub fn evaluate_route(state: &SessionState, access: RouteAccess) -> RouteDecision {
    match (state, access) {
        (SessionState::Checking, _) => RouteDecision::Loading,
        (SessionState::Anonymous, RouteAccess::Protected) => RouteDecision::RedirectToLogin,
        (SessionState::Authenticated(_), RouteAccess::PublicOnly) => RouteDecision::RedirectToHome,
        _ => RouteDecision::Allow,
    }
}
