//! Core geometry for facegate: face-mesh landmarks, blink liveness and the
//! circular face capture sent to the verification service.

pub mod capture;
pub mod landmarks;
pub mod liveness;

pub use capture::{capture_face_jpeg, circular_crop, encode_jpeg, CaptureError};
pub use landmarks::{FaceLandmarks, Landmark, MeshFrame};
pub use liveness::{eye_aspect_ratio, face_ear, BlinkDetector, BlinkEvent, BlinkState, EarHistory};
