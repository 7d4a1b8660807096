//! Shared test doubles for loop and session tests.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::camera::{FrameSource, Snapshot};
use crate::host::{HostSink, OutboundMessage};
use crate::pose::{Detector, Keypoint, KeypointIndex, Pose};

/// Scriptable frame source: readiness and configure failures are plain
/// fields. Encoded frames carry the configured device id so tests can tell
/// which session a frame came from.
pub struct FakeSource {
    pub configured: Option<String>,
    pub has_frames: bool,
    pub fail_configure: bool,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f32>,
    pub frame_counter: u32,
}

impl FakeSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            configured: None,
            has_frames: true,
            fail_configure: false,
            width,
            height,
            fps: None,
            frame_counter: 0,
        }
    }
}

impl FrameSource for FakeSource {
    fn configure(&mut self, device_id: &str) -> Result<()> {
        // previous session is torn down whether or not the new one opens
        self.configured = None;
        if self.fail_configure {
            bail!("device {device_id} unavailable");
        }
        self.configured = Some(device_id.to_string());
        Ok(())
    }

    fn capture_snapshot(&mut self) -> Result<bool> {
        if self.configured.is_none() || !self.has_frames {
            return Ok(false);
        }
        self.frame_counter += 1;
        Ok(true)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.width, self.height)
    }

    fn frame_rate(&self) -> Option<f32> {
        self.fps
    }

    fn encode_frame(&self) -> Result<String> {
        Ok(format!(
            "{}:frame-{}",
            self.configured.clone().unwrap_or_default(),
            self.frame_counter
        ))
    }
}

/// Detector double returning a fixed pose (or a failure) per estimate call.
pub struct FakeDetector {
    pub init_calls: u32,
    pub initialized: bool,
    pub pose: Option<Pose>,
    pub fail_estimate: bool,
}

impl FakeDetector {
    pub fn new() -> Self {
        Self {
            init_calls: 0,
            initialized: false,
            pose: None,
            fail_estimate: false,
        }
    }

    pub fn initialized_with(pose: Option<Pose>) -> Self {
        Self {
            init_calls: 1,
            initialized: true,
            pose,
            fail_estimate: false,
        }
    }
}

#[async_trait]
impl Detector for FakeDetector {
    async fn initialize(&mut self) -> Result<()> {
        self.init_calls += 1;
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    async fn estimate(&mut self, _snapshot: &Snapshot) -> Result<Option<Pose>> {
        if self.fail_estimate {
            bail!("inference failed");
        }
        Ok(self.pose.clone())
    }
}

/// HostSink that records every dispatched message.
#[derive(Clone, Default)]
pub struct RecordingHost {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Drain recorded messages, leaving the recorder empty.
    pub fn take(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }

    pub fn count_of(&self, message: &str) -> usize {
        self.messages()
            .iter()
            .filter(|m| m.message == message)
            .count()
    }
}

impl HostSink for RecordingHost {
    fn dispatch(&self, msg: OutboundMessage) {
        self.messages.lock().unwrap().push(msg);
    }
}

pub fn pose_with_ankles(left: (f32, f32, f32), right: (f32, f32, f32)) -> Pose {
    let mut pose = Pose::default();
    pose.keypoints[KeypointIndex::LeftAnkle as usize] = Keypoint::new(left.0, left.1, left.2);
    pose.keypoints[KeypointIndex::RightAnkle as usize] = Keypoint::new(right.0, right.1, right.2);
    pose
}
