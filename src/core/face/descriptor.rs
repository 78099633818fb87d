// src/core/face/descriptor.rs
use ring::digest;
use serde::{Serialize, Deserialize};

/// Fixed-length feature vector representing a detected face. Comparable only
/// through its distance metric; not invertible to the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDescriptor(Vec<f32>);

impl FaceDescriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean distance between two descriptors. Descriptors of differing
    /// lengths come from different model versions and can never match.
    pub fn distance(&self, other: &FaceDescriptor) -> f32 {
        if self.0.len() != other.0.len() {
            return f32::INFINITY;
        }

        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    /// One-way digest of the canonical little-endian serialization of the
    /// descriptor, hex-encoded. This is the value anchored on the ledger.
    pub fn biometric_hash(&self) -> String {
        let mut bytes = Vec::with_capacity(self.0.len() * 4);
        for value in &self.0 {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let digest = digest::digest(&digest::SHA256, &bytes);
        hex::encode(digest.as_ref())
    }
}
