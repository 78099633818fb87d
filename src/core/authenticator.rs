// src/core/authenticator.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_ASN1};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::utils::error::{Result, IdentityError};

const CHALLENGE_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserVerification {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone)]
pub struct CredentialCreationOptions {
    pub relying_party: RelyingParty,
    pub user_id: Vec<u8>,
    pub user_name: String,
    pub challenge: Vec<u8>,
    pub user_verification: UserVerification,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AssertionOptions {
    pub relying_party_id: String,
    pub challenge: Vec<u8>,
    pub allowed_credentials: Vec<Vec<u8>>,
    pub user_verification: UserVerification,
    pub timeout: Duration,
}

/// Credential material returned by the authenticator at creation. Only the
/// identifier and public key ever leave the device; the private key does not.
/// `public_key` is an uncompressed P-256 point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformCredential {
    pub id: Vec<u8>,
    pub public_key: Vec<u8>,
}

/// Proof-of-possession produced by the authenticator at assertion time. The
/// signature covers `authenticator_data || sha256(client_data)`.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub credential_id: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_verified: bool,
}

/// Platform authenticator capability (fingerprint sensor, security key, ...).
/// Both calls trigger a device-local user interaction and may fail with
/// `AuthenticatorUnavailable` or `UserCancelled`.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    async fn create(&self, options: CredentialCreationOptions) -> Result<PlatformCredential>;

    async fn get(&self, options: AssertionOptions) -> Result<Assertion>;
}

/// Drives credential creation and assertion against the platform
/// authenticator, scoped to one relying party, with a bounded prompt wait.
pub struct CredentialManager {
    authenticator: Arc<dyn PlatformAuthenticator>,
    relying_party: RelyingParty,
    prompt_timeout: Duration,
    rng: SystemRandom,
}

impl CredentialManager {
    pub fn new(
        authenticator: Arc<dyn PlatformAuthenticator>,
        relying_party: RelyingParty,
        prompt_timeout: Duration,
    ) -> Self {
        Self {
            authenticator,
            relying_party,
            prompt_timeout,
            rng: SystemRandom::new(),
        }
    }

    /// Request a new credential for the wallet, requiring user verification
    /// at creation time.
    pub async fn create_credential(&self, wallet_address: &str) -> Result<PlatformCredential> {
        let options = CredentialCreationOptions {
            relying_party: self.relying_party.clone(),
            user_id: wallet_address.as_bytes().to_vec(),
            user_name: wallet_address.to_string(),
            challenge: self.fresh_challenge()?,
            user_verification: UserVerification::Required,
            timeout: self.prompt_timeout,
        };

        debug!(wallet = wallet_address, "Requesting credential creation");
        let credential = self.bounded(self.authenticator.create(options)).await?;
        debug!(
            credential_id = %hex::encode(&credential.id),
            "Platform credential created"
        );
        Ok(credential)
    }

    /// Request proof-of-possession against one of the allowed credentials.
    /// Returns the assertion together with the challenge it must answer.
    pub async fn get_assertion(
        &self,
        allowed_credentials: Vec<Vec<u8>>,
    ) -> Result<(Assertion, Vec<u8>)> {
        let challenge = self.fresh_challenge()?;
        let options = AssertionOptions {
            relying_party_id: self.relying_party.id.clone(),
            challenge: challenge.clone(),
            allowed_credentials,
            user_verification: UserVerification::Required,
            timeout: self.prompt_timeout,
        };

        let assertion = self.bounded(self.authenticator.get(options)).await?;
        Ok((assertion, challenge))
    }

    /// Check an assertion against the enrolled credential: the credential id
    /// must correspond, user verification must have happened, the client data
    /// must answer the issued challenge, and the signature must verify under
    /// the enrolled public key. A failed check is a rejection, not an error.
    pub fn verify_assertion(
        &self,
        assertion: &Assertion,
        credential: &PlatformCredential,
        challenge: &[u8],
    ) -> bool {
        if assertion.credential_id != credential.id {
            warn!("Assertion answered with an unknown credential id");
            return false;
        }

        if !assertion.user_verified {
            warn!("Authenticator did not perform user verification");
            return false;
        }

        if !contains_challenge(&assertion.client_data, challenge) {
            warn!("Assertion client data does not answer the issued challenge");
            return false;
        }

        let mut message = assertion.authenticator_data.clone();
        message.extend_from_slice(digest::digest(&digest::SHA256, &assertion.client_data).as_ref());

        let key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_ASN1, &credential.public_key);
        match key.verify(&message, &assertion.signature) {
            Ok(()) => true,
            Err(_) => {
                warn!("Assertion signature did not verify");
                false
            }
        }
    }

    fn fresh_challenge(&self) -> Result<Vec<u8>> {
        let mut challenge = vec![0u8; CHALLENGE_LEN];
        self.rng
            .fill(&mut challenge)
            .map_err(|_| IdentityError::AuthenticatorUnavailable)?;
        Ok(challenge)
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.prompt_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(IdentityError::Timeout(self.prompt_timeout.as_secs())),
        }
    }
}

fn contains_challenge(client_data: &[u8], challenge: &[u8]) -> bool {
    if challenge.is_empty() || client_data.len() < challenge.len() {
        return false;
    }
    client_data
        .windows(challenge.len())
        .any(|window| window == challenge)
}

/// Development authenticator backed by in-process P-256 keys. Signs real
/// assertions but performs no user interaction; user verification is reported
/// as performed. Not a substitute for a platform backend in production.
pub struct SoftwareAuthenticator {
    keys: parking_lot::RwLock<std::collections::HashMap<Vec<u8>, Vec<u8>>>,
    rng: SystemRandom,
}

impl SoftwareAuthenticator {
    pub fn new() -> Self {
        Self {
            keys: parking_lot::RwLock::new(std::collections::HashMap::new()),
            rng: SystemRandom::new(),
        }
    }
}

impl Default for SoftwareAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformAuthenticator for SoftwareAuthenticator {
    async fn create(&self, _options: CredentialCreationOptions) -> Result<PlatformCredential> {
        use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};

        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &self.rng)
            .map_err(|_| IdentityError::AuthenticatorUnavailable)?;
        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref())
            .map_err(|_| IdentityError::AuthenticatorUnavailable)?;

        let mut id = vec![0u8; 16];
        self.rng
            .fill(&mut id)
            .map_err(|_| IdentityError::AuthenticatorUnavailable)?;

        self.keys.write().insert(id.clone(), pkcs8.as_ref().to_vec());

        Ok(PlatformCredential {
            id,
            public_key: key.public_key().as_ref().to_vec(),
        })
    }

    async fn get(&self, options: AssertionOptions) -> Result<Assertion> {
        use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING};

        let stored = {
            let keys = self.keys.read();
            options
                .allowed_credentials
                .iter()
                .find_map(|id| keys.get(id).map(|pkcs8| (id.clone(), pkcs8.clone())))
        };
        let (credential_id, pkcs8) = stored.ok_or(IdentityError::AuthenticatorUnavailable)?;

        let key = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &pkcs8)
            .map_err(|_| IdentityError::AuthenticatorUnavailable)?;

        // rp_id_hash || flags (UP|UV) || counter, as an authenticator emits.
        let mut authenticator_data = Vec::with_capacity(37);
        authenticator_data.extend_from_slice(
            digest::digest(&digest::SHA256, options.relying_party_id.as_bytes()).as_ref(),
        );
        authenticator_data.push(0x05);
        authenticator_data.extend_from_slice(&0u32.to_be_bytes());

        let client_data = options.challenge.clone();
        let mut message = authenticator_data.clone();
        message.extend_from_slice(digest::digest(&digest::SHA256, &client_data).as_ref());

        let signature = key
            .sign(&self.rng, &message)
            .map_err(|_| IdentityError::AuthenticatorUnavailable)?
            .as_ref()
            .to_vec();

        Ok(Assertion {
            credential_id,
            authenticator_data,
            client_data,
            signature,
            user_verified: true,
        })
    }
}
