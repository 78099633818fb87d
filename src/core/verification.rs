// src/core/verification.rs
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::core::authenticator::CredentialManager;
use crate::core::binding::CredentialBinder;
use crate::core::face::{CapturedFrame, DescriptorExtractor, FaceDescriptor};
use crate::core::identity::types::VerificationOutcome;
use crate::storage::templates::TemplateStore;
use crate::utils::error::{Result, IdentityError};

/// Combines the platform-assertion check and the face-similarity check into
/// one pass/fail decision. The fingerprint gate runs first; the face check is
/// only attempted after it succeeds. `combined` is the AND of both factors.
pub struct VerificationOrchestrator {
    extractor: Arc<DescriptorExtractor>,
    credentials: Arc<CredentialManager>,
    binder: Arc<CredentialBinder>,
    templates: Arc<dyn TemplateStore>,
    match_threshold: f32,
    storage_timeout: Duration,
}

impl VerificationOrchestrator {
    pub fn new(
        extractor: Arc<DescriptorExtractor>,
        credentials: Arc<CredentialManager>,
        binder: Arc<CredentialBinder>,
        templates: Arc<dyn TemplateStore>,
        match_threshold: f32,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            credentials,
            binder,
            templates,
            match_threshold,
            storage_timeout,
        }
    }

    /// Run both factors for the claimed wallet against a live frame.
    ///
    /// Mismatches come back as a rejecting `VerificationOutcome`; errors
    /// (device, ledger, storage, capture) propagate so the caller can tell a
    /// security rejection from an infrastructure failure.
    pub async fn verify(
        &self,
        wallet_address: &str,
        live_frame: &CapturedFrame,
    ) -> Result<VerificationOutcome> {
        if !self.extractor.is_ready() {
            return Err(IdentityError::ModelsNotReady);
        }

        let Some(binding) = self.binder.binding(wallet_address).await? else {
            info!(wallet = wallet_address, "Verification attempted without a binding");
            return Ok(VerificationOutcome::fingerprint_rejected(
                "no credential is bound to this wallet",
            ));
        };

        // Factor one: proof of possession of the bound platform credential.
        let (assertion, challenge) = self
            .credentials
            .get_assertion(vec![binding.credential.id.clone()])
            .await?;

        if !self
            .credentials
            .verify_assertion(&assertion, &binding.credential, &challenge)
        {
            warn!(wallet = wallet_address, "Platform assertion rejected");
            return Ok(VerificationOutcome::fingerprint_rejected(
                "platform assertion did not match the registered credential",
            ));
        }
        debug!(wallet = wallet_address, "Fingerprint factor passed");

        // Factor two: live face against every stored reference.
        let live = self.extractor.extract_primary(live_frame)?;
        let references = self.reference_descriptors(wallet_address).await?;

        let min_distance = references
            .iter()
            .map(|reference| live.distance(reference))
            .fold(f32::INFINITY, f32::min);

        debug!(
            wallet = wallet_address,
            min_distance, threshold = self.match_threshold, "Face comparison complete"
        );

        if min_distance < self.match_threshold {
            info!(wallet = wallet_address, "Verification passed on both factors");
            Ok(VerificationOutcome::accepted())
        } else {
            info!(wallet = wallet_address, "Face factor rejected");
            Ok(VerificationOutcome::face_rejected(format!(
                "face distance {:.4} is not under the threshold {:.4}",
                min_distance, self.match_threshold
            )))
        }
    }

    /// Rebuild reference descriptors from every stored template for the
    /// wallet. Conversions are independent, so they run concurrently; a
    /// stored image in which no face is found is skipped. Zero usable
    /// references is `NoReferenceData`, never a pass.
    async fn reference_descriptors(&self, wallet_address: &str) -> Result<Vec<FaceDescriptor>> {
        let references = tokio::time::timeout(
            self.storage_timeout,
            self.templates.list_references(wallet_address),
        )
        .await
        .unwrap_or_else(|_| {
            Err(IdentityError::StorageUnavailable(format!(
                "template listing timed out after {}s",
                self.storage_timeout.as_secs()
            )))
        })?;

        if references.is_empty() {
            return Err(IdentityError::NoReferenceData(wallet_address.to_string()));
        }

        let mut tasks = Vec::with_capacity(references.len());
        for reference in references {
            let templates = self.templates.clone();
            let extractor = self.extractor.clone();
            let timeout = self.storage_timeout;

            tasks.push(tokio::spawn(async move {
                let blob = tokio::time::timeout(timeout, templates.fetch(&reference))
                    .await
                    .unwrap_or_else(|_| {
                        Err(IdentityError::StorageUnavailable(format!(
                            "template fetch timed out after {}s",
                            timeout.as_secs()
                        )))
                    })?;

                tokio::task::spawn_blocking(move || {
                    let frame = CapturedFrame::from_bytes(&blob)?;
                    extractor.extract_primary(&frame)
                })
                .await
                .map_err(|e| IdentityError::Capture(format!("reference task failed: {}", e)))?
            }));
        }

        let mut descriptors = Vec::new();
        for joined in join_all(tasks).await {
            let result = joined
                .map_err(|e| IdentityError::Capture(format!("reference task failed: {}", e)))?;
            match result {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(IdentityError::NoFaceDetected) => continue,
                Err(e) => return Err(e),
            }
        }

        if descriptors.is_empty() {
            return Err(IdentityError::NoReferenceData(wallet_address.to_string()));
        }
        Ok(descriptors)
    }
}
