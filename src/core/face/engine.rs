// src/core/face/engine.rs
use std::path::Path;

use async_trait::async_trait;

use super::capture::CapturedFrame;
use super::descriptor::FaceDescriptor;
use crate::utils::error::Result;

/// One detection reported by the engine, in detector order.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub descriptor: FaceDescriptor,
    pub confidence: f32,
}

/// Face-recognition capability. Any engine that can localize faces in a frame
/// and compute their descriptors satisfies this contract; the node never
/// depends on a particular model family.
#[async_trait]
pub trait FaceEngine: Send + Sync {
    /// Load model assets from disk. Must complete before any detection.
    async fn load_models(&self, model_dir: &Path) -> Result<()>;

    /// Detect all faces in the frame. An empty result is not an error here;
    /// the extractor decides what zero detections mean.
    fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedFace>>;
}
