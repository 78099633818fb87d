pub mod capture;
pub mod descriptor;
pub mod embedded;
pub mod engine;
pub mod extractor;

pub use capture::{Camera, CameraStream, CapturedFrame};
pub use descriptor::FaceDescriptor;
pub use embedded::EmbeddedEngine;
pub use engine::{DetectedFace, FaceEngine};
pub use extractor::DescriptorExtractor;
