//! Fire-and-forget message boundary to the host application.
//!
//! Outbound messages are addressed by (target, message, optional string or
//! JSON payload), mirroring the host engine's SendMessage convention. The
//! boundary is one-way: dispatch never blocks, never fails, and the host is
//! never told about errors — a missing consumer simply drops messages.

use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

use crate::camera::CaptureDevice;

pub const TARGET_CAMERA_MANAGER: &str = "CameraManager";
pub const TARGET_FOOT_CUBE: &str = "FootCube";

pub const MSG_CAMERA_LIST: &str = "OnReceiveCameraList";
pub const MSG_VIDEO_FRAME: &str = "OnReceiveVideoFrame";
pub const MSG_CAMERA_READY: &str = "OnCameraReady";
pub const MSG_AI_LOADED: &str = "AILoaded";
pub const MSG_FOOT_POSITION: &str = "OnReceiveFootPosition";

/// A single one-way message to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub target: String,
    pub message: String,
    pub payload: Option<String>,
}

impl OutboundMessage {
    fn new(target: &str, message: &str, payload: Option<String>) -> Self {
        Self {
            target: target.to_string(),
            message: message.to_string(),
            payload,
        }
    }
}

/// Tracked point normalized by the snapshot dimensions, each axis in [0,1].
/// Transmitted to the host, never retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

/// Camera list for the host, `[{label, deviceId}, ...]`. Empty labels fall
/// back to `Camera <first 4 chars of id>`.
pub fn camera_list(devices: &[CaptureDevice]) -> OutboundMessage {
    let entries: Vec<serde_json::Value> = devices
        .iter()
        .map(|d| json!({ "label": d.display_label(), "deviceId": d.device_id }))
        .collect();
    OutboundMessage::new(
        TARGET_CAMERA_MANAGER,
        MSG_CAMERA_LIST,
        Some(serde_json::Value::Array(entries).to_string()),
    )
}

/// One encoded video frame (base64 data URL).
pub fn video_frame(data_url: String) -> OutboundMessage {
    OutboundMessage::new(TARGET_CAMERA_MANAGER, MSG_VIDEO_FRAME, Some(data_url))
}

/// Sent once per session, on the first successfully dispatched frame.
pub fn camera_ready() -> OutboundMessage {
    OutboundMessage::new(TARGET_CAMERA_MANAGER, MSG_CAMERA_READY, None)
}

/// Re-sent on every ready pose tick as a best-effort liveness signal.
pub fn ai_loaded() -> OutboundMessage {
    OutboundMessage::new(TARGET_CAMERA_MANAGER, MSG_AI_LOADED, None)
}

/// Normalized tracked-ankle position, `{"x":…,"y":…}`.
pub fn foot_position(point: NormalizedPoint) -> OutboundMessage {
    OutboundMessage::new(
        TARGET_FOOT_CUBE,
        MSG_FOOT_POSITION,
        Some(json!({ "x": point.x, "y": point.y }).to_string()),
    )
}

/// Dispatch side of the host boundary.
pub trait HostSink: Send + Sync {
    fn dispatch(&self, msg: OutboundMessage);
}

/// HostSink over an in-process unbounded channel. The receiving half is the
/// host; if it is gone the message is silently dropped.
#[derive(Clone)]
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostSink for ChannelHost {
    fn dispatch(&self, msg: OutboundMessage) {
        let _ = self.tx.send(msg);
    }
}
