use serde::Deserialize;
use std::time::Duration;
use config::{Config as ConfigLib, ConfigError, Environment, File};
use crate::utils::error::{Result, IdentityError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub face: FaceConfig,
    pub authenticator: AuthenticatorConfig,
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceConfig {
    /// Euclidean distance below which two descriptors count as the same face.
    pub match_threshold: f32,
    pub model_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatorConfig {
    pub relying_party_id: String,
    pub relying_party_name: String,
    pub prompt_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub call_timeout_secs: u64,
    pub anchor_enabled: bool,
    pub rpc_url: String,
    pub keypair_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub template_dir: String,
    pub encryption_key: String,
    pub call_timeout_secs: u64,
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = ConfigLib::builder()
            // Start with default values
            .set_default("node.host", "127.0.0.1")?
            .set_default("node.port", 5000)?
            .set_default("node.log_level", "info")?
            .set_default("node.data_dir", "data")?
            .set_default("face.match_threshold", 0.5)?
            .set_default("face.model_dir", "models")?
            .set_default("authenticator.relying_party_id", "localhost")?
            .set_default("authenticator.relying_party_name", "Web3 Job Marketplace")?
            .set_default("authenticator.prompt_timeout_secs", 60)?
            .set_default("ledger.call_timeout_secs", 30)?
            .set_default("ledger.anchor_enabled", false)?
            .set_default("ledger.rpc_url", "https://api.devnet.solana.com")?
            .set_default("storage.template_dir", "data/templates")?
            .set_default("storage.call_timeout_secs", 30)?

            // Load from config file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., APP_NODE_HOST)
            .add_source(Environment::with_prefix("APP").separator("_"))

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.node.port == 0 {
            return Err(IdentityError::Config("Invalid port number".into()));
        }

        if !(self.face.match_threshold > 0.0 && self.face.match_threshold < 1.0) {
            return Err(IdentityError::Config(
                "face.match_threshold must lie strictly between 0 and 1".into(),
            ));
        }

        if self.authenticator.relying_party_id.is_empty() {
            return Err(IdentityError::Config("relying_party_id must be set".into()));
        }
        if self.authenticator.prompt_timeout_secs == 0 {
            return Err(IdentityError::Config(
                "authenticator.prompt_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.ledger.call_timeout_secs == 0 || self.storage.call_timeout_secs == 0 {
            return Err(IdentityError::Config(
                "ledger and storage call timeouts must be greater than 0".into(),
            ));
        }
        if self.ledger.anchor_enabled && self.ledger.keypair_path.is_none() {
            return Err(IdentityError::Config(
                "ledger.keypair_path must be set when anchoring is enabled".into(),
            ));
        }

        if self.storage.encryption_key.is_empty() {
            return Err(IdentityError::Config("storage.encryption_key must be set".into()));
        }

        Ok(())
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.authenticator.prompt_timeout_secs)
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.call_timeout_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.call_timeout_secs)
    }
}

impl From<ConfigError> for IdentityError {
    fn from(error: ConfigError) -> Self {
        IdentityError::Config(error.to_string())
    }
}
