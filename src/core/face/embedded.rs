// src/core/face/embedded.rs
use std::path::Path;

use async_trait::async_trait;
use image::imageops::{self, FilterType};

use super::capture::CapturedFrame;
use super::descriptor::FaceDescriptor;
use super::engine::{DetectedFace, FaceEngine};
use crate::utils::error::Result;

const EDGE: u32 = 16;
// Intensity spread below this reads as a featureless frame.
const MIN_SPREAD: f32 = 1.0;

/// Model-free engine computing a unit-normalized whole-frame intensity
/// embedding. Carries no landmark localization: adequate for demos and tests
/// where the full frame is the subject, not for production face matching.
/// Swap a landmark-based engine in behind the same trait for real
/// deployments.
pub struct EmbeddedEngine;

#[async_trait]
impl FaceEngine for EmbeddedEngine {
    async fn load_models(&self, _model_dir: &Path) -> Result<()> {
        // The embedding needs no external assets.
        Ok(())
    }

    fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedFace>> {
        let gray = imageops::grayscale(&frame.image);
        let thumb = imageops::resize(&gray, EDGE, EDGE, FilterType::Triangle);

        let values: Vec<f32> = thumb.pixels().map(|p| f32::from(p.0[0])).collect();
        let count = values.len() as f32;

        let mean = values.iter().sum::<f32>() / count;
        let spread = (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / count).sqrt();

        if spread < MIN_SPREAD {
            return Ok(vec![]);
        }

        let centered: Vec<f32> = values.iter().map(|v| (v - mean) / spread).collect();
        let norm = centered.iter().map(|v| v * v).sum::<f32>().sqrt();
        let embedding: Vec<f32> = centered.iter().map(|v| v / norm).collect();

        Ok(vec![DetectedFace {
            descriptor: FaceDescriptor::new(embedding),
            confidence: (spread / 64.0).min(1.0),
        }])
    }
}
