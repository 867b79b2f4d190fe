//! The camera + landmark detector seam.
//!
//! The face-mesh model and the camera driver live outside this crate. A
//! [`FrameSource`] wraps both: it opens the camera at a target resolution,
//! runs the detector on each video frame and hands back the landmarks, and
//! can produce the raw frame currently on screen for capture.

use std::future::Future;

use facegate_core::MeshFrame;
use image::RgbImage;
use thiserror::Error;

use crate::session::{
    MSG_CAMERA_DENIED, MSG_CAMERA_UNAVAILABLE, MSG_DETECTOR_FAILED, MSG_STREAM_FAILED,
};

/// Detector configuration applied on every open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshSettings {
    pub max_faces: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("landmark detector failed to initialize: {0}")]
    DetectorInit(String),
    #[error("video frame not ready")]
    NotReady,
    #[error("frame stream failed: {0}")]
    Stream(String),
    #[error("failed to release camera resources: {0}")]
    Release(String),
}

impl SourceError {
    /// Message shown to the user when this error ends a session.
    pub fn user_message(&self) -> &'static str {
        match self {
            SourceError::PermissionDenied => MSG_CAMERA_DENIED,
            SourceError::Unavailable(_) => MSG_CAMERA_UNAVAILABLE,
            SourceError::DetectorInit(_) => MSG_DETECTOR_FAILED,
            SourceError::NotReady | SourceError::Stream(_) | SourceError::Release(_) => {
                MSG_STREAM_FAILED
            }
        }
    }
}

/// Camera and landmark detector owned by a single login session.
///
/// `stop`, `close` and `release_tracks` must be idempotent: the controller calls
/// all three on every teardown, whether or not `open` succeeded.
pub trait FrameSource {
    /// Acquire the camera and start a fresh detector.
    fn open(
        &mut self,
        settings: &MeshSettings,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Wait for the next processed frame. `Ok(None)` means the stream ended.
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<MeshFrame>, SourceError>> + Send;

    /// The full video frame currently on screen.
    fn snapshot(&mut self) -> Result<RgbImage, SourceError>;

    /// Stop the camera driver that pumps frames into the detector.
    fn stop(&mut self) -> Result<(), SourceError>;

    /// Close the detector and free its internal resources.
    fn close(&mut self) -> Result<(), SourceError>;

    /// Stop every media track and detach the video element from the stream.
    fn release_tracks(&mut self) -> Result<(), SourceError>;
}
