pub mod device;
pub mod source;

pub use device::CaptureDevice;
#[cfg(feature = "desktop")]
pub use device::enumerate_devices;
#[cfg(feature = "desktop")]
pub use source::OpenCvFrameSource;
pub use source::{FrameSource, Snapshot};
