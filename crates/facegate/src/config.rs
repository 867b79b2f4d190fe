use std::time::Duration;

use facegate_core::capture::{DEFAULT_CROP_RATIO, DEFAULT_JPEG_QUALITY};
use facegate_core::liveness::{DEFAULT_CLOSE_THRESHOLD, DEFAULT_HISTORY_LEN, DEFAULT_REOPEN_MARGIN};

use crate::source::MeshSettings;

/// Local-development fallback for the verification service.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Face login configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the face verification service.
    pub api_base: String,
    /// EAR below which the eyes count as closing.
    pub ear_close_threshold: f32,
    /// Added to `ear_close_threshold` to get the reopen level.
    pub ear_reopen_margin: f32,
    /// Number of EAR samples kept for diagnostics.
    pub ear_history_len: usize,
    /// Pause between blink detection and capture, so the UI can confirm the blink.
    pub capture_delay: Duration,
    /// Upper bound on camera acquisition and detector start-up.
    pub camera_timeout: Duration,
    /// Upper bound on the verification round trip.
    pub verify_timeout: Duration,
    /// Capture resolution requested from the camera.
    pub frame_width: u32,
    pub frame_height: u32,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Fraction of the shorter frame edge covered by the face crop.
    pub crop_ratio: f32,
    /// JPEG quality (1-100) of the uploaded crop.
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ear_close_threshold: DEFAULT_CLOSE_THRESHOLD,
            ear_reopen_margin: DEFAULT_REOPEN_MARGIN,
            ear_history_len: DEFAULT_HISTORY_LEN,
            capture_delay: Duration::from_millis(500),
            camera_timeout: Duration::from_secs(10),
            verify_timeout: Duration::from_secs(15),
            frame_width: 640,
            frame_height: 480,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            crop_ratio: DEFAULT_CROP_RATIO,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: std::env::var("FACEGATE_API_BASE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_base),
            ear_close_threshold: env_parse(
                "FACEGATE_EAR_CLOSE_THRESHOLD",
                defaults.ear_close_threshold,
            ),
            ear_reopen_margin: env_parse("FACEGATE_EAR_REOPEN_MARGIN", defaults.ear_reopen_margin),
            ear_history_len: env_parse("FACEGATE_EAR_HISTORY_LEN", defaults.ear_history_len),
            capture_delay: Duration::from_millis(env_parse(
                "FACEGATE_CAPTURE_DELAY_MS",
                defaults.capture_delay.as_millis() as u64,
            )),
            camera_timeout: Duration::from_secs(env_parse(
                "FACEGATE_CAMERA_TIMEOUT_SECS",
                defaults.camera_timeout.as_secs(),
            )),
            verify_timeout: Duration::from_secs(env_parse(
                "FACEGATE_VERIFY_TIMEOUT_SECS",
                defaults.verify_timeout.as_secs(),
            )),
            frame_width: env_parse("FACEGATE_FRAME_WIDTH", defaults.frame_width),
            frame_height: env_parse("FACEGATE_FRAME_HEIGHT", defaults.frame_height),
            min_detection_confidence: env_parse(
                "FACEGATE_MIN_DETECTION_CONFIDENCE",
                defaults.min_detection_confidence,
            ),
            min_tracking_confidence: env_parse(
                "FACEGATE_MIN_TRACKING_CONFIDENCE",
                defaults.min_tracking_confidence,
            ),
            crop_ratio: env_parse("FACEGATE_CROP_RATIO", defaults.crop_ratio),
            jpeg_quality: env_parse("FACEGATE_JPEG_QUALITY", defaults.jpeg_quality),
        }
    }

    /// Settings handed to the landmark detector on every `start()`.
    pub fn mesh_settings(&self) -> MeshSettings {
        MeshSettings {
            max_faces: 1,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            width: self.frame_width,
            height: self.frame_height,
        }
    }

    /// Full URL of the quick verification endpoint.
    pub fn verify_url(&self) -> String {
        format!("{}/face/verify-quick", self.api_base.trim_end_matches('/'))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
