// Frame acquisition. The tracker only ever sees the `FrameSource` trait: a
// non-blocking "is there a new frame?" poll plus a snapshot read.
// `CameraCapture` runs the nokhwa camera on its own thread and hands decoded
// frames across a small channel.

use crate::error::{Error, Result};
use crate::types::{Frame, PixelLayout};

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

/// Where frames come from. Implementations must never block in `poll`.
pub trait FrameSource {
    /// True when a frame newer than the last one returned is ready this tick.
    fn poll(&mut self) -> bool;

    /// Latest frame, carrying the resolution the device actually delivered.
    fn current_frame(&self) -> Option<&Frame>;

    /// Current (width, height); may change between calls on renegotiation.
    fn resolution(&self) -> (u32, u32);

    /// Release the device. Safe to call more than once.
    fn close(&mut self);
}

// Frames queued between the capture thread and the tick loop;
// the consumer only wants the newest one.
const FRAME_QUEUE_DEPTH: usize = 2;
// Consecutive grab failures after which the capture thread gives up.
const MAX_GRAB_FAILURES: u32 = 30;

/// nokhwa camera driven from a dedicated capture thread.
pub struct CameraCapture {
    frames: Receiver<Frame>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    latest: Option<Frame>,
    width: u32,
    height: u32,
}

impl CameraCapture {
    /// Open camera `index`, asking for `width`x`height` (the device may pick something else).
    /// Fails with `DeviceUnavailable` if there is no camera; callers treat that as "stay inert".
    pub fn open(index: u32, width: u32, height: u32, layout: PixelLayout) -> Result<Self> {
        let (init_tx, init_rx) = bounded::<Result<(u32, u32)>>(1);
        let (frame_tx, frame_rx) = bounded::<Frame>(FRAME_QUEUE_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));

        let stop_flag = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || {
                // The camera handle is created and dropped on this thread only.
                let mut cam = match open_camera(index, width, height) {
                    Ok(cam) => cam,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let actual = cam.resolution();
                let _ = init_tx.send(Ok((actual.width(), actual.height())));
                capture_loop(&mut cam, layout, &frame_tx, &stop_flag);
                if let Err(e) = cam.stop_stream() {
                    warn!("camera stop_stream failed: {e}");
                }
            })
            .map_err(|e| Error::device_unavailable(format!("spawn capture thread: {e}")))?;

        let init = init_rx
            .recv()
            .unwrap_or_else(|_| Err(Error::device_unavailable("capture thread exited early")));
        match init {
            Ok((w, h)) => {
                info!(index, requested = %format!("{width}x{height}"), actual = %format!("{w}x{h}"), "camera opened");
                Ok(Self {
                    frames: frame_rx,
                    stop,
                    worker: Some(worker),
                    latest: None,
                    width: w,
                    height: h,
                })
            }
            Err(e) => {
                let _ = worker.join();
                Err(e)
            }
        }
    }
}

fn open_camera(index: u32, width: u32, height: u32) -> Result<Camera> {
    let fmt = CameraFormat::new(
        Resolution::new(width, height),
        FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
        30,
    );
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

    // Fails when no device exists at this index.
    let mut cam = Camera::new(CameraIndex::Index(index), req)
        .map_err(|e| Error::device_unavailable(format!("create camera {index}: {e}")))?;
    cam.open_stream()
        .map_err(|e| Error::device_unavailable(format!("open stream: {e}")))?;
    Ok(cam)
}

fn capture_loop(
    cam: &mut Camera,
    layout: PixelLayout,
    frames: &crossbeam_channel::Sender<Frame>,
    stop: &AtomicBool,
) {
    let mut failures = 0u32;
    while !stop.load(Ordering::Relaxed) {
        // Blocks until the driver hands over the next buffer.
        let decoded = cam
            .frame()
            .map_err(|e| Error::camera_frame(format!("fetch frame: {e}")))
            .and_then(|buf| {
                buf.decode_image::<RgbFormat>()
                    .map_err(|e| Error::camera_frame(format!("decode RGB: {e}")))
            });

        let img = match decoded {
            Ok(img) => {
                failures = 0;
                img
            }
            Err(e) => {
                failures += 1;
                debug!("{e}");
                if failures >= MAX_GRAB_FAILURES {
                    warn!("camera stopped delivering frames after {failures} failures");
                    break;
                }
                continue;
            }
        };

        let frame = Frame::from_rgb(&img, layout);
        match frames.try_send(frame) {
            Ok(()) => {}
            // Consumer is behind; drop this frame.
            Err(crossbeam_channel::TrySendError::Full(_)) => {}
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
        }
    }
}

impl FrameSource for CameraCapture {
    fn poll(&mut self) -> bool {
        let mut fresh = false;
        loop {
            match self.frames.try_recv() {
                Ok(frame) => {
                    self.latest = Some(frame);
                    fresh = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if let Some(f) = &self.latest {
            if fresh && (f.width, f.height) != (self.width, self.height) {
                info!(
                    "camera renegotiated {}x{} -> {}x{}",
                    self.width, self.height, f.width, f.height
                );
                self.width = f.width;
                self.height = f.height;
            }
        }
        fresh
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.latest.as_ref()
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.stop.store(true, Ordering::Relaxed);
        if worker.join().is_err() {
            warn!("camera capture thread panicked");
        }
        self.latest = None;
        info!("camera closed");
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.close();
    }
}
