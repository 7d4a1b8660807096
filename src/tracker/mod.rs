pub mod foot;
pub mod smooth;

pub use foot::{select_ankle, FootTracker};
pub use smooth::PointSmoother;
