//! Session orchestration: device switching and loop lifecycle.
//!
//! Exactly one capture session is live at a time. The controller owns the
//! loop task handles and the shared source/detector/tracker state that the
//! loops run against; switching devices is an explicit cancel → configure →
//! restart sequence instead of juggling global loop ids.

use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use crate::camera::{CaptureDevice, FrameSource};
use crate::config::Config;
use crate::host::{self, HostSink};
use crate::loops::{spawn_frame_loop, spawn_pose_loop, LoopHandle};
use crate::pose::Detector;
use crate::tracker::FootTracker;

/// Device enumeration seam; the desktop bin plugs in OpenCV probing, tests
/// plug in a fixed list.
pub type DeviceLister = Box<dyn Fn() -> Vec<CaptureDevice> + Send>;

pub struct SessionController<S, D, H> {
    source: Arc<Mutex<S>>,
    detector: Arc<AsyncMutex<D>>,
    // smoothing state deliberately survives device switches
    tracker: Arc<Mutex<FootTracker>>,
    sink: H,
    device_lister: DeviceLister,
    display_fps: f32,
    frame_loop: Option<LoopHandle>,
    pose_loop: Option<LoopHandle>,
}

impl<S, D, H> SessionController<S, D, H>
where
    S: FrameSource + 'static,
    D: Detector + 'static,
    H: HostSink + Clone + 'static,
{
    pub fn new(source: S, detector: D, sink: H, config: &Config, device_lister: DeviceLister) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            detector: Arc::new(AsyncMutex::new(detector)),
            tracker: Arc::new(Mutex::new(FootTracker::new(
                config.tracking.min_score,
                config.tracking.smoothing_alpha,
            ))),
            sink,
            device_lister,
            display_fps: config.camera.display_fps,
            frame_loop: None,
            pose_loop: None,
        }
    }

    /// Host registration: refresh the device list and send it across the
    /// boundary. Safe to call repeatedly; each call re-enumerates.
    pub fn register(&mut self) -> Vec<CaptureDevice> {
        let devices = (self.device_lister)();
        self.sink.dispatch(host::camera_list(&devices));
        devices
    }

    /// Switch the capture device and restart both loops.
    ///
    /// Sequence: cancel both loops and wait for their final ticks, configure
    /// the source, start the frame loop, make sure the detector is loaded
    /// (first successful call wins), start the pose loop. `&mut self` keeps
    /// switches serial; callers must not interleave them from several tasks.
    pub async fn switch_device(&mut self, device_id: &str) {
        eprintln!("[session] switching to device {device_id}");
        self.cancel_loops().await;

        // A setup failure leaves the previous session torn down and no new
        // one established. The loops below still start and sit in WAITING,
        // so the only host-visible signal is the absence of frames.
        if let Err(e) = self.source.lock().unwrap().configure(device_id) {
            eprintln!("[session] camera setup failed: {e:#}");
        }

        self.frame_loop = Some(spawn_frame_loop(
            self.source.clone(),
            self.sink.clone(),
            self.display_fps,
        ));

        {
            let mut detector = self.detector.lock().await;
            if !detector.is_initialized() {
                if let Err(e) = detector.initialize().await {
                    eprintln!("[session] detector load failed: {e:#}");
                }
            }
        }

        // prefer the source's decode cadence over the display refresh
        let pose_fps = {
            let source = self.source.lock().unwrap();
            source.frame_rate().unwrap_or(self.display_fps)
        };
        self.pose_loop = Some(spawn_pose_loop(
            self.source.clone(),
            self.detector.clone(),
            self.tracker.clone(),
            self.sink.clone(),
            pose_fps,
        ));
    }

    /// Cancel both loops and wait for them to stop. Cancelling
    /// already-stopped loops is a no-op.
    pub async fn cancel_loops(&mut self) {
        if let Some(handle) = self.frame_loop.take() {
            handle.cancel().await;
        }
        if let Some(handle) = self.pose_loop.take() {
            handle.cancel().await;
        }
    }

    pub fn source(&self) -> Arc<Mutex<S>> {
        self.source.clone()
    }

    pub fn detector(&self) -> Arc<AsyncMutex<D>> {
        self.detector.clone()
    }
}
