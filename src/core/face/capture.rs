// src/core/face/capture.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::RgbImage;

use crate::utils::error::{Result, IdentityError};

/// One frame pulled from a camera stream or decoded from an uploaded image.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }

    /// Decode an encoded image (JPEG, PNG, ...) into a frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| IdentityError::Capture(format!("Failed to decode image: {}", e)))?;
        Ok(Self::new(image.to_rgb8()))
    }

    /// Encode the frame as PNG for template persistence.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        self.image
            .write_to(&mut cursor, image::ImageOutputFormat::Png)
            .map_err(|e| IdentityError::Capture(format!("Failed to encode frame: {}", e)))?;
        Ok(bytes)
    }
}

/// Camera device capability. Opening yields an exclusive stream.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self) -> Result<Box<dyn CameraStream>>;
}

/// An open camera stream. The holder owns the device exclusively; `stop` must
/// release it and must be safe to call more than once. Implementations also
/// release the device on drop.
#[async_trait]
pub trait CameraStream: Send {
    async fn grab_frame(&mut self) -> Result<CapturedFrame>;

    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let frame = CapturedFrame::new(RgbImage::new(8, 6));
        let bytes = frame.encode_png().unwrap();

        let decoded = CapturedFrame::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.image.width(), 8);
        assert_eq!(decoded.image.height(), 6);
    }

    #[test]
    fn garbage_bytes_are_a_capture_error() {
        let err = CapturedFrame::from_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, IdentityError::Capture(_)));
    }
}
