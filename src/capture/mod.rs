//! Camera and heart-rate estimation seams.
//!
//! The webcam and the rPPG library are external collaborators. A check-in
//! talks to them only through the traits in this module:
//!
//! - [`Camera`] opens the device and hands back a [`FrameStream`]
//! - [`HeartRateEstimator`] turns one frame into an instantaneous bpm reading
//! - [`OpenCamera`] scopes an open stream so it is closed on every exit path
//!
//! [`synthetic`] provides deterministic implementations for the headless host
//! and for tests.

pub mod synthetic;

use image::RgbImage;
use tracing::debug;

/// One captured video frame, RGB ordered.
pub type Frame = RgbImage;

/// Errors raised by capture collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture device cannot be opened.
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// A capture device that can be opened for one measurement window.
pub trait Camera: Send {
    /// Open the device.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Unavailable`] when the device is missing or busy.
    fn open(&mut self) -> Result<Box<dyn FrameStream>, CaptureError>;
}

/// An open camera producing frames.
pub trait FrameStream: Send {
    /// Read the next frame, or `None` when the stream has ended.
    fn read_frame(&mut self) -> Option<Frame>;

    /// Release the device. Called exactly once by [`OpenCamera`].
    fn close(&mut self) {}
}

/// Remote-photoplethysmography estimator.
pub trait HeartRateEstimator: Send {
    /// Feed one frame and return the current estimate in bpm.
    ///
    /// Returns `None` while the estimator is still warming up.
    fn process_frame(&mut self, frame: &Frame) -> Option<f64>;
}

/// Scoped handle over an open [`FrameStream`].
///
/// The stream is closed when the handle is dropped, including on unwind.
pub struct OpenCamera {
    stream: Box<dyn FrameStream>,
    closed: bool,
}

impl OpenCamera {
    /// Open `camera` and take ownership of its stream.
    ///
    /// # Errors
    ///
    /// Propagates the camera's [`CaptureError`].
    pub fn open(camera: &mut dyn Camera) -> Result<Self, CaptureError> {
        let stream = camera.open()?;
        debug!("camera opened");
        Ok(Self {
            stream,
            closed: false,
        })
    }

    /// Read the next frame.
    pub fn read_frame(&mut self) -> Option<Frame> {
        if self.closed {
            return None;
        }
        self.stream.read_frame()
    }

    /// Release the camera now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.stream.close();
            debug!("camera released");
        }
    }
}

impl Drop for OpenCamera {
    fn drop(&mut self) {
        self.release();
    }
}

/// Frame prepared for the live preview window.
#[derive(Debug, Clone)]
pub struct Preview {
    /// Mirrored frame, so the user sees themselves as in a mirror.
    pub image: Frame,
    /// Overlay text for the bottom-left corner.
    pub label: String,
}

impl Preview {
    /// Build a preview for `frame` and the latest `reading`.
    pub fn new(frame: &Frame, reading: Option<f64>) -> Self {
        Self {
            image: image::imageops::flip_horizontal(frame),
            label: overlay_label(reading),
        }
    }
}

/// Overlay text for the preview window.
pub fn overlay_label(reading: Option<f64>) -> String {
    match reading {
        Some(bpm) if bpm > 0.0 => format!("{bpm:.1} (bpm)"),
        _ => "Analyzing...".to_owned(),
    }
}
