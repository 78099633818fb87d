// src/core/face/extractor.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::capture::CapturedFrame;
use super::descriptor::FaceDescriptor;
use super::engine::{DetectedFace, FaceEngine};
use crate::utils::error::{Result, IdentityError};

/// Turns a frame into the primary face's descriptor. Gated behind a readiness
/// flag: every capture path fails with `ModelsNotReady` until `load_models`
/// has completed once.
pub struct DescriptorExtractor {
    engine: Arc<dyn FaceEngine>,
    model_dir: PathBuf,
    ready: AtomicBool,
}

impl DescriptorExtractor {
    pub fn new(engine: Arc<dyn FaceEngine>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            model_dir: model_dir.into(),
            ready: AtomicBool::new(false),
        }
    }

    pub async fn load_models(&self) -> Result<()> {
        info!(dir = %self.model_dir.display(), "Loading face recognition models");
        self.engine.load_models(&self.model_dir).await?;
        self.ready.store(true, Ordering::Release);
        info!("Face recognition models loaded");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Extract the descriptor of the primary face in the frame.
    ///
    /// Primary-face policy: highest detector-reported confidence wins; on a
    /// tie the earlier detection is kept.
    pub fn extract_primary(&self, frame: &CapturedFrame) -> Result<FaceDescriptor> {
        if !self.is_ready() {
            return Err(IdentityError::ModelsNotReady);
        }

        let faces = self.engine.detect(frame)?;
        debug!(count = faces.len(), "Face detection complete");

        let primary = pick_primary(&faces).ok_or(IdentityError::NoFaceDetected)?;
        Ok(primary.descriptor.clone())
    }
}

fn pick_primary(faces: &[DetectedFace]) -> Option<&DetectedFace> {
    let mut best: Option<&DetectedFace> = None;
    for face in faces {
        match best {
            Some(current) if face.confidence <= current.confidence => {}
            _ => best = Some(face),
        }
    }
    best
}
