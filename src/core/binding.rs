// src/core/binding.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::authenticator::PlatformCredential;
use crate::core::identity::types::CredentialBinding;
use crate::utils::error::{Result, IdentityError};

/// Durable credential ledger capability (smart contract, anchored store, ...).
/// The ledger itself must guarantee at-most-one binding per wallet under
/// concurrent writers; the binder adds the policy layer on top.
#[async_trait]
pub trait CredentialLedger: Send + Sync {
    async fn register_binding(&self, binding: CredentialBinding) -> Result<()>;

    async fn binding_for(&self, wallet_address: &str) -> Result<Option<CredentialBinding>>;
}

/// Associates a wallet address with its biometric hash and platform
/// credential through the ledger. All ledger calls are bounded by the
/// configured timeout; an expired call surfaces as `LedgerUnavailable`.
pub struct CredentialBinder {
    ledger: Arc<dyn CredentialLedger>,
    call_timeout: Duration,
}

impl CredentialBinder {
    pub fn new(ledger: Arc<dyn CredentialLedger>, call_timeout: Duration) -> Self {
        Self {
            ledger,
            call_timeout,
        }
    }

    /// Write the binding. Re-binding identical data is an accepted no-op; a
    /// differing active binding is rejected, never silently replaced.
    pub async fn bind(
        &self,
        wallet_address: &str,
        biometric_hash: &str,
        credential: PlatformCredential,
    ) -> Result<()> {
        let existing = self.bounded(self.ledger.binding_for(wallet_address)).await?;

        if let Some(existing) = existing {
            if existing.matches(biometric_hash, &credential.id) {
                info!(wallet = wallet_address, "Binding already registered, nothing to do");
                return Ok(());
            }
            warn!(wallet = wallet_address, "Refusing to overwrite active binding");
            return Err(IdentityError::BindingConflict(wallet_address.to_string()));
        }

        let binding = CredentialBinding::new(wallet_address, biometric_hash, credential);
        self.bounded(self.ledger.register_binding(binding)).await?;
        info!(wallet = wallet_address, "Credential binding registered");
        Ok(())
    }

    /// Whether the supplied hash equals the bound hash for the wallet.
    /// `false`, not an error, when no binding exists.
    pub async fn verify(&self, wallet_address: &str, biometric_hash: &str) -> Result<bool> {
        let binding = self.bounded(self.ledger.binding_for(wallet_address)).await?;
        Ok(binding
            .map(|b| b.biometric_hash == biometric_hash)
            .unwrap_or(false))
    }

    /// The active binding for a wallet, if any.
    pub async fn binding(&self, wallet_address: &str) -> Result<Option<CredentialBinding>> {
        self.bounded(self.ledger.binding_for(wallet_address)).await
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::LedgerUnavailable(format!(
                "call timed out after {}s",
                self.call_timeout.as_secs()
            ))),
        }
    }
}
