//! Durable key-value storage for session credentials.

pub mod file;

pub use file::TokenStore;

/// Storage keys as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "jendo_access_token";
    pub const REFRESH_TOKEN: &str = "jendo_refresh_token";
    /// Last-known user profile, kept only as a rehydration hint.
    pub const USER_PROFILE: &str = "jendo_user_profile";
}
