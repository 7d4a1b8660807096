//! Frame-delivery and pose-inference loops.
//!
//! Both loops are independent self-rescheduling tasks: an interval tick
//! multiplexed with a cancellation token. A tick that finds its inputs not
//! ready reschedules without side effects; errors inside a tick are logged
//! and the loop keeps running. The tick bodies live in plain structs so the
//! state transitions are testable without the scheduler or a real device.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::camera::FrameSource;
use crate::host::{self, HostSink, NormalizedPoint};
use crate::pose::Detector;
use crate::tracker::FootTracker;

/// Cancellable handle for a running loop task.
pub struct LoopHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl LoopHandle {
    /// Cancel the loop and wait for its in-flight tick to finish. A tick
    /// suspended in inference cannot be interrupted; it is waited out, so no
    /// dispatch from this loop happens after `cancel` resolves.
    pub async fn cancel(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

fn cadence(fps: f32) -> Duration {
    Duration::from_secs_f32(1.0 / fps.max(1.0))
}

/// Frame-loop readiness states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLoopState {
    /// The source has not produced a decodable frame yet.
    Waiting,
    /// Frames are flowing to the host.
    Streaming,
}

/// One frame-delivery tick: capture the snapshot, encode it, dispatch it.
/// The first successful dispatch of a session also announces the camera.
pub struct FrameLoop {
    state: FrameLoopState,
    camera_ready_sent: bool,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: FrameLoopState::Waiting,
            camera_ready_sent: false,
        }
    }

    pub fn state(&self) -> FrameLoopState {
        self.state
    }

    pub fn tick<S: FrameSource>(&mut self, source: &Mutex<S>, sink: &impl HostSink) {
        let encoded = {
            let mut source = source.lock().unwrap();
            match source.capture_snapshot() {
                Ok(true) => {}
                Ok(false) => {
                    // not ready: reschedule with no side effects
                    self.state = FrameLoopState::Waiting;
                    return;
                }
                Err(e) => {
                    eprintln!("[frame] capture error: {e:#}");
                    return;
                }
            }
            match source.encode_frame() {
                Ok(data) => data,
                Err(e) => {
                    eprintln!("[frame] encode error: {e:#}");
                    return;
                }
            }
        };

        self.state = FrameLoopState::Streaming;
        sink.dispatch(host::video_frame(encoded));
        if !self.camera_ready_sent {
            sink.dispatch(host::camera_ready());
            self.camera_ready_sent = true;
        }
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the frame loop at display-refresh cadence until cancelled.
pub fn spawn_frame_loop<S, H>(source: Arc<Mutex<S>>, sink: H, display_fps: f32) -> LoopHandle
where
    S: FrameSource + 'static,
    H: HostSink + 'static,
{
    let token = CancellationToken::new();
    let loop_token = token.clone();
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cadence(display_fps));
        let mut frame_loop = FrameLoop::new();
        loop {
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            frame_loop.tick(source.as_ref(), &sink);
        }
    });
    LoopHandle { token, join }
}

/// One pose-inference tick: readiness check, liveness signal, estimate,
/// ankle selection/gating/smoothing, normalized dispatch.
///
/// The tracker is shared with the controller so smoothing state persists
/// across loop restarts.
pub struct PoseLoop {
    tracker: Arc<Mutex<FootTracker>>,
}

impl PoseLoop {
    pub fn new(tracker: Arc<Mutex<FootTracker>>) -> Self {
        Self { tracker }
    }

    pub async fn tick<S, D>(
        &mut self,
        source: &Mutex<S>,
        detector: &AsyncMutex<D>,
        sink: &impl HostSink,
    ) where
        S: FrameSource,
        D: Detector,
    {
        if !detector.lock().await.is_initialized() {
            return;
        }

        // capture synchronously, then release the source before inference
        let snapshot = {
            let mut source = source.lock().unwrap();
            match source.capture_snapshot() {
                Ok(true) => source.snapshot(),
                Ok(false) => return,
                Err(e) => {
                    eprintln!("[pose] capture error: {e:#}");
                    return;
                }
            }
        };

        // Re-sent on every ready tick on purpose: a best-effort "inference
        // backend is alive" signal rather than a one-time event.
        sink.dispatch(host::ai_loaded());

        let estimated = {
            let mut detector = detector.lock().await;
            detector.estimate(&snapshot).await
        };
        let pose = match estimated {
            Ok(Some(pose)) => pose,
            Ok(None) => return,
            Err(e) => {
                eprintln!("[pose] inference error: {e:#}");
                return;
            }
        };

        let Some((x, y)) = self.tracker.lock().unwrap().update(&pose) else {
            return;
        };
        let (width, height) = snapshot.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        sink.dispatch(host::foot_position(NormalizedPoint {
            x: x / width as f32,
            y: y / height as f32,
        }));
    }
}

/// Spawn the pose loop until cancelled. `fps` is the source's native frame
/// rate when known, the display-refresh rate otherwise.
pub fn spawn_pose_loop<S, D, H>(
    source: Arc<Mutex<S>>,
    detector: Arc<AsyncMutex<D>>,
    tracker: Arc<Mutex<FootTracker>>,
    sink: H,
    fps: f32,
) -> LoopHandle
where
    S: FrameSource + 'static,
    D: Detector + 'static,
    H: HostSink + 'static,
{
    let token = CancellationToken::new();
    let loop_token = token.clone();
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cadence(fps));
        let mut pose_loop = PoseLoop::new(tracker);
        loop {
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            pose_loop.tick(source.as_ref(), detector.as_ref(), &sink).await;
        }
    });
    LoopHandle { token, join }
}
