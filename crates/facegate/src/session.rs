//! Session status, the UI-observable view and user-facing notices.

use std::fmt;

use serde::Serialize;

pub const MSG_CAMERA_DENIED: &str =
    "Camera access denied. Please allow camera permissions and try again.";
pub const MSG_CAMERA_UNAVAILABLE: &str =
    "No camera available. Please connect a camera and try again.";
pub const MSG_CAMERA_TIMEOUT: &str = "Camera did not start in time. Please try again.";
pub const MSG_DETECTOR_FAILED: &str = "Failed to initialize face detection. Please try again.";
pub const MSG_STREAM_FAILED: &str = "Camera stream was interrupted. Please try again.";
pub const MSG_NO_MATCH: &str = "No matching face found. Please try again.";
pub const MSG_VERIFY_FAILED: &str = "Face verification failed. Please try again.";
pub const MSG_BLINK_DETECTED: &str = "Blink detected! Capturing your face...";
pub const MSG_VERIFIED: &str = "Face verified successfully.";

/// Where a login session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    /// No camera active.
    #[default]
    Idle,
    /// Camera and landmark stream active, waiting for a blink.
    Detecting,
    /// Blink seen; capture is scheduled.
    BlinkDetected,
    /// Capture and verification round trip in flight.
    Verifying,
    /// Verified; camera released.
    Complete,
}

impl SessionStatus {
    /// Forward-only transitions, plus the reset path back to `Idle`.
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (_, Idle)
                | (Idle, Detecting)
                | (Detecting, BlinkDetected)
                | (BlinkDetected, Verifying)
                | (Verifying, Complete)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Detecting => "detecting",
            SessionStatus::BlinkDetected => "blink-detected",
            SessionStatus::Verifying => "verifying",
            SessionStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a UI renders: status, the current error message and blink progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub status: SessionStatus,
    pub error: Option<String>,
    pub blink_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient user-facing notification (toast).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
