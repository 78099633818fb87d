// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use parking_lot::RwLock;

use biobind::core::authenticator::{
    Assertion, AssertionOptions, CredentialCreationOptions, CredentialManager,
    PlatformAuthenticator, PlatformCredential, RelyingParty, SoftwareAuthenticator,
};
use biobind::core::binding::{CredentialBinder, CredentialLedger};
use biobind::core::face::{
    Camera, CameraStream, CapturedFrame, DescriptorExtractor, DetectedFace, FaceDescriptor,
    FaceEngine,
};
use biobind::core::identity::types::CredentialBinding;
use biobind::storage::DiskTemplateStore;
use biobind::utils::error::{IdentityError, Result};

/// Engine whose detections are keyed by frame width, so tests can script
/// which "face" a frame contains. Unknown widths detect nothing.
pub struct WidthKeyedEngine {
    faces: RwLock<HashMap<u32, Vec<f32>>>,
    detect_calls: AtomicUsize,
}

impl WidthKeyedEngine {
    pub fn new() -> Self {
        Self {
            faces: RwLock::new(HashMap::new()),
            detect_calls: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, width: u32, descriptor: Vec<f32>) {
        self.faces.write().insert(width, descriptor);
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceEngine for WidthKeyedEngine {
    async fn load_models(&self, _model_dir: &Path) -> Result<()> {
        Ok(())
    }

    fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedFace>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .faces
            .read()
            .get(&frame.image.width())
            .map(|values| {
                vec![DetectedFace {
                    descriptor: FaceDescriptor::new(values.clone()),
                    confidence: 0.9,
                }]
            })
            .unwrap_or_default())
    }
}

/// A frame tagged through its width, matching `WidthKeyedEngine` scripting.
pub fn frame(width: u32) -> CapturedFrame {
    CapturedFrame::new(RgbImage::new(width, 8))
}

pub struct CancellingAuthenticator;

#[async_trait]
impl PlatformAuthenticator for CancellingAuthenticator {
    async fn create(&self, _options: CredentialCreationOptions) -> Result<PlatformCredential> {
        Err(IdentityError::UserCancelled)
    }

    async fn get(&self, _options: AssertionOptions) -> Result<Assertion> {
        Err(IdentityError::UserCancelled)
    }
}

/// Ledger recording every write, with optional scripted unavailability.
pub struct CountingLedger {
    bindings: RwLock<HashMap<String, CredentialBinding>>,
    register_calls: AtomicUsize,
    available: std::sync::atomic::AtomicBool,
}

impl CountingLedger {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            register_calls: AtomicUsize::new(0),
            available: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn binding(&self, wallet_address: &str) -> Option<CredentialBinding> {
        self.bindings.read().get(wallet_address).cloned()
    }
}

#[async_trait]
impl CredentialLedger for CountingLedger {
    async fn register_binding(&self, binding: CredentialBinding) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(IdentityError::LedgerUnavailable("scripted outage".into()));
        }
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.bindings
            .write()
            .insert(binding.wallet_address.clone(), binding);
        Ok(())
    }

    async fn binding_for(&self, wallet_address: &str) -> Result<Option<CredentialBinding>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(IdentityError::LedgerUnavailable("scripted outage".into()));
        }
        Ok(self.bindings.read().get(wallet_address).cloned())
    }
}

/// Camera yielding one scripted frame, counting stream releases.
pub struct ScriptedCamera {
    frame_width: Option<u32>,
    stops: Arc<AtomicUsize>,
}

impl ScriptedCamera {
    pub fn yielding(frame_width: u32) -> Self {
        Self {
            frame_width: Some(frame_width),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            frame_width: None,
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct ScriptedStream {
    frame_width: Option<u32>,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl Camera for ScriptedCamera {
    async fn open(&self) -> Result<Box<dyn CameraStream>> {
        Ok(Box::new(ScriptedStream {
            frame_width: self.frame_width,
            stops: self.stops.clone(),
        }))
    }
}

#[async_trait]
impl CameraStream for ScriptedStream {
    async fn grab_frame(&mut self) -> Result<CapturedFrame> {
        match self.frame_width {
            Some(width) => Ok(frame(width)),
            None => Err(IdentityError::Capture("device disconnected".into())),
        }
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// The collaborators one orchestrator run needs, wired over the given
/// capabilities with short test timeouts.
pub struct TestStack {
    pub extractor: Arc<DescriptorExtractor>,
    pub credentials: Arc<CredentialManager>,
    pub binder: Arc<CredentialBinder>,
    pub templates: Arc<DiskTemplateStore>,
}

impl TestStack {
    pub async fn new(
        engine: Arc<dyn FaceEngine>,
        authenticator: Arc<dyn PlatformAuthenticator>,
        ledger: Arc<dyn CredentialLedger>,
        template_root: &Path,
    ) -> Self {
        let extractor = Arc::new(DescriptorExtractor::new(engine, "models"));
        extractor.load_models().await.expect("model load");

        let credentials = Arc::new(CredentialManager::new(
            authenticator,
            RelyingParty {
                id: "localhost".into(),
                name: "Web3 Job Marketplace".into(),
            },
            Duration::from_secs(60),
        ));
        let binder = Arc::new(CredentialBinder::new(ledger, Duration::from_secs(5)));
        let templates = Arc::new(DiskTemplateStore::new(template_root, b"test-key"));

        Self {
            extractor,
            credentials,
            binder,
            templates,
        }
    }
}

pub fn software_authenticator() -> Arc<SoftwareAuthenticator> {
    Arc::new(SoftwareAuthenticator::new())
}
