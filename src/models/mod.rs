// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Wire models shared with the identity service and the business API.

pub mod auth;
pub mod portal;
pub mod user;

pub use auth::{AuthResponse, TokenPair};
pub use portal::{
    Appointment, AppointmentRequest, ChatReply, Doctor, MedicalRecord, TestResult,
    WellnessArticle,
};
pub use user::{HealthParameters, Role, User, UserUpdate};
