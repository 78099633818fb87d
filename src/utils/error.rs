// src/utils/error.rs
use thiserror::Error;

/// How a failure should be presented to the caller: retry locally, escalate
/// to support, or treat as a security-relevant rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Retry,
    Support,
    Rejected,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Face recognition models are not loaded")]
    ModelsNotReady,

    #[error("No face detected in the captured frame")]
    NoFaceDetected,

    #[error("No reference descriptors stored for wallet {0}")]
    NoReferenceData(String),

    #[error("No compatible platform authenticator available")]
    AuthenticatorUnavailable,

    #[error("User cancelled the authenticator prompt")]
    UserCancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Wallet {0} already holds a differing credential binding")]
    BindingConflict(String),

    #[error("Credential ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Template storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Wallet is not connected")]
    WalletNotConnected,

    #[error("Enrollment step attempted out of order: {0}")]
    InvalidStage(String),

    #[error("Capture error: {0}")]
    Capture(String),
}

impl IdentityError {
    /// Classify the failure for the UI shell: "try again" conditions keep the
    /// user in the flow, "contact support" conditions end it, rejections are
    /// the authenticator or matcher saying no.
    pub fn class(&self) -> FailureClass {
        match self {
            IdentityError::ModelsNotReady
            | IdentityError::NoFaceDetected
            | IdentityError::UserCancelled
            | IdentityError::Timeout(_)
            | IdentityError::WalletNotConnected
            | IdentityError::Capture(_) => FailureClass::Retry,

            IdentityError::Config(_)
            | IdentityError::AuthenticatorUnavailable
            | IdentityError::LedgerUnavailable(_)
            | IdentityError::StorageUnavailable(_)
            | IdentityError::InvalidStage(_) => FailureClass::Support,

            IdentityError::NoReferenceData(_) | IdentityError::BindingConflict(_) => {
                FailureClass::Rejected
            }
        }
    }

    /// True when the user can simply re-invoke the failed step.
    pub fn is_retryable(&self) -> bool {
        self.class() == FailureClass::Retry
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
