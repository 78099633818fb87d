pub mod api;
pub mod blockchain;
pub mod core;
pub mod storage;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::{
    blockchain::{AnchoredLedger, SolanaAnchor},
    core::{
        authenticator::{CredentialManager, PlatformAuthenticator, RelyingParty},
        binding::{CredentialBinder, CredentialLedger},
        enrollment::EnrollmentOrchestrator,
        face::{DescriptorExtractor, FaceEngine},
        verification::VerificationOrchestrator,
    },
    storage::{BindingStore, DiskTemplateStore, TemplateStore},
    utils::{config::Config, error::{Result, IdentityError}},
};

/// Shared collaborators handed to request handlers. Everything is constructed
/// once at startup and injected; there are no global client singletons.
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<DescriptorExtractor>,
    pub credentials: Arc<CredentialManager>,
    pub binder: Arc<CredentialBinder>,
    pub templates: Arc<dyn TemplateStore>,
    pub verifier: Arc<VerificationOrchestrator>,
}

impl AppState {
    /// Fresh enrollment state machine for one attempt.
    pub fn enrollment(&self) -> EnrollmentOrchestrator {
        EnrollmentOrchestrator::new(
            self.extractor.clone(),
            self.credentials.clone(),
            self.binder.clone(),
            self.templates.clone(),
            self.config.storage_timeout(),
        )
    }
}

pub struct Application {
    config: Arc<Config>,
    state: Arc<AppState>,
}

impl Application {
    /// Wire stores, ledger and services. The face engine and platform
    /// authenticator are capabilities supplied by the caller.
    pub async fn new(
        config: Config,
        engine: Arc<dyn FaceEngine>,
        authenticator: Arc<dyn PlatformAuthenticator>,
    ) -> Result<Self> {
        let config = Arc::new(config);

        info!("Initializing storage...");
        let data_dir = Path::new(&config.node.data_dir);
        let bindings = BindingStore::open(data_dir.join("bindings"))?;

        let ledger: Arc<dyn CredentialLedger> = if config.ledger.anchor_enabled {
            let keypair_path = config.ledger.keypair_path.as_ref().ok_or_else(|| {
                IdentityError::Config("ledger.keypair_path must be set when anchoring is enabled".into())
            })?;
            let keypair = solana_sdk::signature::read_keypair_file(keypair_path)
                .map_err(|e| IdentityError::Config(format!("failed to read anchor keypair: {}", e)))?;
            let anchor = SolanaAnchor::new(&config.ledger.rpc_url, keypair)?;
            info!(rpc = %config.ledger.rpc_url, "On-chain anchoring enabled");
            Arc::new(AnchoredLedger::new(bindings, anchor))
        } else {
            Arc::new(bindings)
        };

        let templates: Arc<dyn TemplateStore> = Arc::new(DiskTemplateStore::new(
            &config.storage.template_dir,
            config.storage.encryption_key.as_bytes(),
        ));

        info!("Initializing services...");
        let extractor = Arc::new(DescriptorExtractor::new(engine, config.face.model_dir.clone()));
        let credentials = Arc::new(CredentialManager::new(
            authenticator,
            RelyingParty {
                id: config.authenticator.relying_party_id.clone(),
                name: config.authenticator.relying_party_name.clone(),
            },
            config.prompt_timeout(),
        ));
        let binder = Arc::new(CredentialBinder::new(ledger, config.ledger_timeout()));
        let verifier = Arc::new(VerificationOrchestrator::new(
            extractor.clone(),
            credentials.clone(),
            binder.clone(),
            templates.clone(),
            config.face.match_threshold,
            config.storage_timeout(),
        ));

        let state = Arc::new(AppState {
            config: config.clone(),
            extractor,
            credentials,
            binder,
            templates,
            verifier,
        });

        Ok(Self { config, state })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Load model assets, then serve the API until shutdown.
    pub async fn run(&self) -> Result<()> {
        info!("Loading face recognition models...");
        self.state.extractor.load_models().await?;

        info!("Starting API server...");
        let state = self.state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::from(state.clone()))
                .service(api::handlers::identity::scope())
                .service(api::handlers::health::scope())
        })
        .bind((self.config.node.host.as_str(), self.config.node.port))
        .map_err(|e| IdentityError::Config(format!("Failed to bind API server: {}", e)))?
        .run();

        info!(
            host = %self.config.node.host,
            port = self.config.node.port,
            "Application started"
        );
        server
            .await
            .map_err(|e| IdentityError::Config(format!("API server error: {}", e)))
    }
}
