// SPDX-License-Identifier: MIT
// Copyright 2026 Jendo Health <dev@jendohealth.com>

//! Typed business API surface consumed by the UI layer.
//!
//! Thin wrappers only: paths, payload types and download destinations.
//! Auth attachment and 401 recovery live in [`ApiClient`].

use crate::error::Result;
use crate::models::portal::{
    Appointment, AppointmentRequest, ChatMessage, ChatReply, Doctor, MedicalRecord, TestResult,
    WellnessArticle,
};
use crate::models::user::{User, UserUpdate};
use crate::services::api::ApiClient;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct PortalService {
    api: Arc<ApiClient>,
}

impl PortalService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    // ─── Profile ─────────────────────────────────────────────────────────

    /// Authoritative profile fetch; also the session restore probe.
    pub async fn get_profile(&self) -> Result<User> {
        self.api.get_json("/users/profile").await
    }

    pub async fn update_profile(&self, update: &UserUpdate) -> Result<User> {
        self.api.put_json("/users/profile", update).await
    }

    // ─── Doctors & appointments ──────────────────────────────────────────

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>> {
        self.api.get_json("/doctors").await
    }

    pub async fn book_appointment(&self, request: &AppointmentRequest) -> Result<Appointment> {
        self.api.post_json("/appointments", request).await
    }

    pub async fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.api.get_json("/appointments").await
    }

    pub async fn cancel_appointment(&self, id: u64) -> Result<()> {
        self.api.delete(&format!("/appointments/{}", id)).await
    }

    // ─── Test results & medical records ──────────────────────────────────

    pub async fn list_test_results(&self) -> Result<Vec<TestResult>> {
        self.api.get_json("/tests/results").await
    }

    /// Save a test report to `destination` as an opaque blob.
    pub async fn download_test_report(&self, id: u64, destination: &Path) -> Result<()> {
        self.api
            .download(&format!("/tests/results/{}/report", id), destination)
            .await
    }

    pub async fn list_medical_records(&self) -> Result<Vec<MedicalRecord>> {
        self.api.get_json("/medical-records").await
    }

    pub async fn download_medical_record(&self, id: u64, destination: &Path) -> Result<()> {
        self.api
            .download(&format!("/medical-records/{}/file", id), destination)
            .await
    }

    // ─── Wellness & assistant ────────────────────────────────────────────

    /// Wellness content lives under the public prefix and is sent
    /// unauthenticated.
    pub async fn wellness_articles(&self) -> Result<Vec<WellnessArticle>> {
        self.api.get_json("/wellness/articles").await
    }

    pub async fn ask_assistant(&self, message: &str) -> Result<ChatReply> {
        let body = ChatMessage {
            message: message.to_string(),
        };
        self.api.post_json("/assistant/chat", &body).await
    }
}
