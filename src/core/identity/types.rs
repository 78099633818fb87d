// src/core/identity/types.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

use crate::core::authenticator::PlatformCredential;

/// The subject of enrollment, keyed by its wallet address. Created implicitly
/// on first successful enrollment; revocation is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub wallet_address: String,
    pub enrollment_status: EnrollmentStatus,
    pub enrolled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Unenrolled,
    Enrolled,
}

impl Identity {
    pub fn unenrolled(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            enrollment_status: EnrollmentStatus::Unenrolled,
            enrolled_at: None,
        }
    }

    /// Enrollment view of a wallet, derived from its active binding.
    pub fn from_binding(wallet_address: &str, binding: Option<&CredentialBinding>) -> Self {
        match binding {
            Some(binding) => Self {
                wallet_address: wallet_address.to_string(),
                enrollment_status: EnrollmentStatus::Enrolled,
                enrolled_at: Some(binding.created_at),
            },
            None => Self::unenrolled(wallet_address),
        }
    }

    pub fn is_enrolled(&self) -> bool {
        self.enrollment_status == EnrollmentStatus::Enrolled
    }
}

/// The durable record anchoring a wallet to its biometric hash and platform
/// credential. At most one active binding exists per wallet address. The
/// credential's public key is pinned here so login can verify assertions
/// instead of trusting the authenticator's word; the private key never
/// leaves the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialBinding {
    pub wallet_address: String,
    pub biometric_hash: String,
    pub credential: PlatformCredential,
    pub created_at: DateTime<Utc>,
}

impl CredentialBinding {
    pub fn new(
        wallet_address: impl Into<String>,
        biometric_hash: impl Into<String>,
        credential: PlatformCredential,
    ) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            biometric_hash: biometric_hash.into(),
            credential,
            created_at: Utc::now(),
        }
    }

    /// Whether a candidate enrollment carries exactly the data already bound.
    pub fn matches(&self, biometric_hash: &str, credential_id: &[u8]) -> bool {
        self.biometric_hash == biometric_hash && self.credential.id == credential_id
    }
}

/// Reported to the caller after an enrollment attempt. `warning` is set when
/// the ledger write succeeded but the template could not be persisted.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentOutcome {
    pub success: bool,
    pub wallet_address: String,
    pub warning: Option<String>,
}

impl EnrollmentOutcome {
    pub fn complete(wallet_address: impl Into<String>) -> Self {
        Self {
            success: true,
            wallet_address: wallet_address.into(),
            warning: None,
        }
    }

    pub fn partial(wallet_address: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            success: true,
            wallet_address: wallet_address.into(),
            warning: Some(warning.into()),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.warning.is_some()
    }
}

/// Transient per-attempt verification result. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub fingerprint_verified: bool,
    pub face_verified: bool,
    pub combined: bool,
    pub reason: Option<String>,
}

impl VerificationOutcome {
    pub fn new(fingerprint_verified: bool, face_verified: bool, reason: Option<String>) -> Self {
        Self {
            fingerprint_verified,
            face_verified,
            combined: fingerprint_verified && face_verified,
            reason,
        }
    }

    /// The fingerprint gate failed; the face check was never attempted.
    pub fn fingerprint_rejected(reason: impl Into<String>) -> Self {
        Self::new(false, false, Some(reason.into()))
    }

    pub fn face_rejected(reason: impl Into<String>) -> Self {
        Self::new(true, false, Some(reason.into()))
    }

    pub fn accepted() -> Self {
        Self::new(true, true, None)
    }
}
