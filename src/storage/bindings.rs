// src/storage/bindings.rs
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{DB, Options};
use tracing::info;

use crate::core::binding::CredentialLedger;
use crate::core::identity::types::CredentialBinding;
use crate::utils::error::{Result, IdentityError};

/// Local durable binding index, one record per wallet. Serves as the ledger
/// implementation for a standalone node and as the read index in front of the
/// on-chain anchor.
pub struct BindingStore {
    db: DB,
    // register_binding is a read-check-write; serialize writers so two
    // concurrent enrollments for one wallet cannot both pass the check.
    write_lock: Mutex<()>,
}

impl BindingStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)
            .map_err(|e| IdentityError::LedgerUnavailable(e.to_string()))?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn key(wallet_address: &str) -> Vec<u8> {
        format!("binding/{}", wallet_address.to_lowercase()).into_bytes()
    }

    fn read(&self, wallet_address: &str) -> Result<Option<CredentialBinding>> {
        let raw = self
            .db
            .get(Self::key(wallet_address))
            .map_err(|e| IdentityError::LedgerUnavailable(e.to_string()))?;

        match raw {
            Some(bytes) => {
                let binding = serde_json::from_slice(&bytes)
                    .map_err(|e| IdentityError::LedgerUnavailable(e.to_string()))?;
                Ok(Some(binding))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CredentialLedger for BindingStore {
    async fn register_binding(&self, binding: CredentialBinding) -> Result<()> {
        let _guard = self.write_lock.lock();

        // At-most-one binding per wallet, enforced at the store itself.
        if let Some(existing) = self.read(&binding.wallet_address)? {
            if existing.matches(&binding.biometric_hash, &binding.credential.id) {
                return Ok(());
            }
            return Err(IdentityError::BindingConflict(binding.wallet_address));
        }

        let serialized = serde_json::to_vec(&binding)
            .map_err(|e| IdentityError::LedgerUnavailable(e.to_string()))?;
        self.db
            .put(Self::key(&binding.wallet_address), serialized)
            .map_err(|e| IdentityError::LedgerUnavailable(e.to_string()))?;

        info!(wallet = %binding.wallet_address, "Binding persisted");
        Ok(())
    }

    async fn binding_for(&self, wallet_address: &str) -> Result<Option<CredentialBinding>> {
        self.read(wallet_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::authenticator::PlatformCredential;
    use tempfile::tempdir;

    fn credential(id: u8) -> PlatformCredential {
        PlatformCredential {
            id: vec![id; 16],
            public_key: vec![0x04; 65],
        }
    }

    #[tokio::test]
    async fn persisted_binding_survives_reopen() {
        let tmp = tempdir().unwrap();

        {
            let store = BindingStore::open(tmp.path()).unwrap();
            store
                .register_binding(CredentialBinding::new("0xABC", "hash-1", credential(1)))
                .await
                .unwrap();
        }

        let store = BindingStore::open(tmp.path()).unwrap();
        let binding = store.binding_for("0xABC").await.unwrap().unwrap();
        assert_eq!(binding.biometric_hash, "hash-1");
        assert_eq!(binding.credential.id, vec![1; 16]);
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive_on_wallet() {
        let tmp = tempdir().unwrap();
        let store = BindingStore::open(tmp.path()).unwrap();

        store
            .register_binding(CredentialBinding::new("0xAbC", "hash-1", credential(1)))
            .await
            .unwrap();

        assert!(store.binding_for("0xabc").await.unwrap().is_some());
        assert!(store.binding_for("0xABC").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn differing_rebind_is_rejected_at_the_store() {
        let tmp = tempdir().unwrap();
        let store = BindingStore::open(tmp.path()).unwrap();

        store
            .register_binding(CredentialBinding::new("0xABC", "hash-1", credential(1)))
            .await
            .unwrap();
        let err = store
            .register_binding(CredentialBinding::new("0xABC", "hash-2", credential(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::BindingConflict(_)));
    }

    #[tokio::test]
    async fn missing_binding_reads_as_none() {
        let tmp = tempdir().unwrap();
        let store = BindingStore::open(tmp.path()).unwrap();
        assert!(store.binding_for("0xABC").await.unwrap().is_none());
    }
}
