//! Blink-gated face login.
//!
//! [`FaceLogin`] owns a camera/landmark [`FrameSource`], waits for one blink as
//! a liveness signal, captures the face and asks a [`Verifier`] who it is.

pub mod config;
pub mod controller;
pub mod session;
pub mod source;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use controller::{FaceLogin, FrameOutcome, LoginError, SuccessFn};
pub use session::{Notice, NoticeLevel, SessionStatus, SessionView};
pub use source::{FrameSource, MeshSettings, SourceError};
pub use verifier::{HttpVerifier, Verifier, VerifyError, VerifyResponse};
