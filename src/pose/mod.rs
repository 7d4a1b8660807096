pub mod detector;
pub mod keypoint;

pub use detector::Detector;
#[cfg(feature = "desktop")]
pub use detector::MoveNetDetector;
pub use keypoint::{Keypoint, KeypointIndex, Pose};
