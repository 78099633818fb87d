// src/core/enrollment.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::authenticator::{CredentialManager, PlatformCredential};
use crate::core::binding::CredentialBinder;
use crate::core::face::{Camera, CapturedFrame, DescriptorExtractor, FaceDescriptor};
use crate::core::identity::types::EnrollmentOutcome;
use crate::storage::templates::TemplateStore;
use crate::utils::error::{Result, IdentityError};

/// Stages of one enrollment attempt, advanced strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStage {
    Idle,
    WalletConnected,
    FaceCaptured,
    CredentialCreated,
    Bound,
    Complete,
}

/// Drives one user through capture, credential creation, ledger binding and
/// template persistence. One orchestrator instance per attempt; collaborators
/// are shared.
///
/// Failure handling follows the stage the failure hit: capture failures leave
/// the wallet connected and are retried freely, authenticator failures drop
/// the captured face and return to `WalletConnected`, ledger and storage
/// failures are terminal for the attempt and reported to the caller.
pub struct EnrollmentOrchestrator {
    extractor: Arc<DescriptorExtractor>,
    credentials: Arc<CredentialManager>,
    binder: Arc<CredentialBinder>,
    templates: Arc<dyn TemplateStore>,
    storage_timeout: Duration,
    stage: EnrollmentStage,
    wallet_address: Option<String>,
    descriptor: Option<FaceDescriptor>,
    template_blob: Option<Vec<u8>>,
    credential: Option<PlatformCredential>,
}

impl EnrollmentOrchestrator {
    pub fn new(
        extractor: Arc<DescriptorExtractor>,
        credentials: Arc<CredentialManager>,
        binder: Arc<CredentialBinder>,
        templates: Arc<dyn TemplateStore>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            credentials,
            binder,
            templates,
            storage_timeout,
            stage: EnrollmentStage::Idle,
            wallet_address: None,
            descriptor: None,
            template_blob: None,
            credential: None,
        }
    }

    pub fn stage(&self) -> EnrollmentStage {
        self.stage
    }

    /// `Idle -> WalletConnected`. Every later step requires this one.
    pub fn connect_wallet(&mut self, wallet_address: &str) -> Result<()> {
        if wallet_address.is_empty() {
            return Err(IdentityError::WalletNotConnected);
        }
        if self.stage != EnrollmentStage::Idle {
            return Err(IdentityError::InvalidStage(format!(
                "wallet already connected at stage {:?}",
                self.stage
            )));
        }

        self.wallet_address = Some(wallet_address.to_string());
        self.stage = EnrollmentStage::WalletConnected;
        info!(wallet = wallet_address, "Enrollment started");
        Ok(())
    }

    /// `WalletConnected -> FaceCaptured`. May be retried indefinitely before
    /// advancing; a failed capture leaves the stage untouched and makes no
    /// ledger or storage call.
    pub fn capture_face(&mut self, frame: &CapturedFrame) -> Result<()> {
        match self.stage {
            EnrollmentStage::WalletConnected | EnrollmentStage::FaceCaptured => {}
            EnrollmentStage::Idle => return Err(IdentityError::WalletNotConnected),
            other => {
                return Err(IdentityError::InvalidStage(format!(
                    "capture attempted at stage {:?}",
                    other
                )))
            }
        }

        let descriptor = self.extractor.extract_primary(frame)?;
        let blob = frame.encode_png()?;

        self.descriptor = Some(descriptor);
        self.template_blob = Some(blob);
        self.stage = EnrollmentStage::FaceCaptured;
        Ok(())
    }

    /// Capture from a camera device. The stream is held exclusively for the
    /// duration of the grab and released on every exit path.
    pub async fn capture_face_from(&mut self, camera: &dyn Camera) -> Result<()> {
        let mut stream = camera.open().await?;
        let grabbed = stream.grab_frame().await;
        stream.stop();

        let frame = grabbed?;
        self.capture_face(&frame)
    }

    /// `FaceCaptured -> CredentialCreated`. On any authenticator failure the
    /// attempt falls back to `WalletConnected` and the capture is discarded;
    /// no partial state is carried forward.
    pub async fn create_credential(&mut self) -> Result<()> {
        if self.stage != EnrollmentStage::FaceCaptured {
            return Err(IdentityError::InvalidStage(format!(
                "credential creation attempted at stage {:?}",
                self.stage
            )));
        }
        let wallet = self.wallet()?;

        match self.credentials.create_credential(&wallet).await {
            Ok(credential) => {
                self.credential = Some(credential);
                self.stage = EnrollmentStage::CredentialCreated;
                Ok(())
            }
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "Credential creation failed, returning to capture");
                self.descriptor = None;
                self.template_blob = None;
                self.stage = EnrollmentStage::WalletConnected;
                Err(e)
            }
        }
    }

    /// `CredentialCreated -> Bound -> Complete`. Binding failures are
    /// terminal for the attempt. If template storage fails after the ledger
    /// write succeeded, the outcome is reported as partial rather than
    /// rolled back; ledger and storage are not transactional.
    pub async fn finalize(&mut self) -> Result<EnrollmentOutcome> {
        if self.stage != EnrollmentStage::CredentialCreated {
            return Err(IdentityError::InvalidStage(format!(
                "finalize attempted at stage {:?}",
                self.stage
            )));
        }
        let wallet = self.wallet()?;
        let descriptor = self
            .descriptor
            .as_ref()
            .ok_or_else(|| IdentityError::InvalidStage("no captured descriptor".into()))?;
        let credential = self
            .credential
            .clone()
            .ok_or_else(|| IdentityError::InvalidStage("no created credential".into()))?;

        let biometric_hash = descriptor.biometric_hash();
        self.binder
            .bind(&wallet, &biometric_hash, credential)
            .await?;
        self.stage = EnrollmentStage::Bound;

        let blob = self
            .template_blob
            .take()
            .ok_or_else(|| IdentityError::InvalidStage("no captured template".into()))?;

        let stored = tokio::time::timeout(self.storage_timeout, self.templates.store(&wallet, &blob))
            .await
            .unwrap_or_else(|_| {
                Err(IdentityError::StorageUnavailable(format!(
                    "template store call timed out after {}s",
                    self.storage_timeout.as_secs()
                )))
            });

        self.stage = EnrollmentStage::Complete;
        match stored {
            Ok(_) => {
                info!(wallet = %wallet, "Enrollment complete");
                Ok(EnrollmentOutcome::complete(wallet))
            }
            Err(e) => {
                warn!(wallet = %wallet, error = %e, "Binding registered but template storage failed");
                Ok(EnrollmentOutcome::partial(
                    wallet,
                    format!("credential bound but template not stored: {}", e),
                ))
            }
        }
    }

    /// Convenience driver for callers that already hold a frame: runs the
    /// full staged flow for one wallet.
    pub async fn enroll(
        &mut self,
        wallet_address: &str,
        frame: &CapturedFrame,
    ) -> Result<EnrollmentOutcome> {
        self.connect_wallet(wallet_address)?;
        self.capture_face(frame)?;
        self.create_credential().await?;
        self.finalize().await
    }

    fn wallet(&self) -> Result<String> {
        self.wallet_address
            .clone()
            .ok_or(IdentityError::WalletNotConnected)
    }
}
