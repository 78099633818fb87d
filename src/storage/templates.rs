// src/storage/templates.rs
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::utils::error::{Result, IdentityError};

const TEMPLATE_EXT: &str = "tpl";

/// Pointer to one stored face template for a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub wallet_address: String,
    pub path: PathBuf,
    pub stored_at: DateTime<Utc>,
}

/// Face template persistence capability. References returned by `store` and
/// `list_references` feed descriptor rebuilding at verification time.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn store(&self, wallet_address: &str, blob: &[u8]) -> Result<TemplateRef>;

    async fn list_references(&self, wallet_address: &str) -> Result<Vec<TemplateRef>>;

    async fn fetch(&self, reference: &TemplateRef) -> Result<Vec<u8>>;
}

struct TemplateCipher {
    cipher: Aes256Gcm,
    rng: SystemRandom,
}

impl TemplateCipher {
    fn new(key: &[u8]) -> Self {
        let hash = digest::digest(&digest::SHA256, key);
        let cipher_key = Key::<Aes256Gcm>::from_slice(hash.as_ref());
        Self {
            cipher: Aes256Gcm::new(cipher_key),
            rng: SystemRandom::new(),
        }
    }

    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; 12];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| IdentityError::StorageUnavailable("nonce generation failed".into()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, data)
            .map_err(|e| IdentityError::StorageUnavailable(format!("encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(nonce_bytes.len() + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    fn decrypt(&self, encrypted_data: &[u8]) -> Result<Vec<u8>> {
        if encrypted_data.len() < 12 {
            return Err(IdentityError::StorageUnavailable(
                "invalid encrypted template length".into(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| IdentityError::StorageUnavailable(format!("decryption failed: {}", e)))
    }
}

/// Directory-per-wallet template store. Blobs are validated as decodable
/// images and encrypted at rest.
pub struct DiskTemplateStore {
    root: PathBuf,
    cipher: TemplateCipher,
}

impl DiskTemplateStore {
    pub fn new(root: impl Into<PathBuf>, encryption_key: &[u8]) -> Self {
        Self {
            root: root.into(),
            cipher: TemplateCipher::new(encryption_key),
        }
    }

    fn wallet_dir(&self, wallet_address: &str) -> PathBuf {
        self.root.join(wallet_address.to_lowercase())
    }
}

#[async_trait]
impl TemplateStore for DiskTemplateStore {
    async fn store(&self, wallet_address: &str, blob: &[u8]) -> Result<TemplateRef> {
        image::load_from_memory(blob)
            .map_err(|e| IdentityError::Capture(format!("template blob is not an image: {}", e)))?;

        let dir = self.wallet_dir(wallet_address);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?;

        let path = dir.join(format!("{}.{}", Uuid::new_v4(), TEMPLATE_EXT));
        let encrypted = self.cipher.encrypt(blob)?;
        tokio::fs::write(&path, encrypted)
            .await
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?;

        info!(wallet = wallet_address, path = %path.display(), "Stored face template");
        Ok(TemplateRef {
            wallet_address: wallet_address.to_string(),
            path,
            stored_at: Utc::now(),
        })
    }

    async fn list_references(&self, wallet_address: &str) -> Result<Vec<TemplateRef>> {
        let dir = self.wallet_dir(wallet_address);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?;

        let mut references = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXT) {
                continue;
            }
            let stored_at = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(Utc::now);
            references.push(TemplateRef {
                wallet_address: wallet_address.to_string(),
                path,
                stored_at,
            });
        }

        references.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(wallet = wallet_address, count = references.len(), "Listed templates");
        Ok(references)
    }

    async fn fetch(&self, reference: &TemplateRef) -> Result<Vec<u8>> {
        ensure_under_root(&self.root, &reference.path)?;
        let encrypted = tokio::fs::read(&reference.path)
            .await
            .map_err(|e| IdentityError::StorageUnavailable(e.to_string()))?;
        self.cipher.decrypt(&encrypted)
    }
}

fn ensure_under_root(root: &Path, path: &Path) -> Result<()> {
    if path.starts_with(root) {
        Ok(())
    } else {
        Err(IdentityError::StorageUnavailable(format!(
            "reference path {} escapes the template root",
            path.display()
        )))
    }
}
