pub mod keypoint;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod source;
pub mod worker;

pub use keypoint::{Keypoint, KeypointIndex, Pose};
#[cfg(feature = "onnx")]
pub use onnx::YoloPoseSource;
pub use source::KeypointSource;
pub use worker::{InferenceOutcome, InferenceWorker};
