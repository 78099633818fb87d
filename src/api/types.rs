// src/api/types.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::core::identity::types::{CredentialBinding, EnrollmentStatus, Identity};

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub wallet_address: String,
    pub face_image: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub wallet_address: String,
    pub face_image: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct BindingStatusResponse {
    pub wallet_address: String,
    pub status: EnrollmentStatus,
    pub biometric_hash: Option<String>,
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl BindingStatusResponse {
    pub fn from_binding(wallet_address: &str, binding: Option<CredentialBinding>) -> Self {
        let identity = Identity::from_binding(wallet_address, binding.as_ref());
        Self {
            wallet_address: identity.wallet_address,
            status: identity.enrollment_status,
            biometric_hash: binding.map(|b| b.biometric_hash),
            enrolled_at: identity.enrolled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub models_ready: bool,
    pub version: String,
}
