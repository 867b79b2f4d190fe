//! Active liveness detection via eye aspect ratio (EAR) blink analysis.
//!
//! A printed photograph or a still image held up to the camera has a fixed
//! eye shape. A live person can close and reopen their eyes, which shows up
//! as a dip and recovery of the eye aspect ratio computed from six mesh
//! landmarks per eye.
//!
//! The decision uses two thresholds. An eye is flagged as closing when the EAR
//! falls below the close threshold, and a blink only counts once the EAR climbs
//! back above a higher reopen threshold. Jitter around a single boundary
//! therefore never produces a blink.
//!
//! # Threat Coverage
//!
//! - **Blocks:** Printed photographs, static images on a screen.
//! - **Does not block:** Video replay of a blinking subject, 3D masks with
//!   moving eyelids.

use std::collections::VecDeque;

use crate::landmarks::{FaceLandmarks, Landmark, LEFT_EYE, RIGHT_EYE};

/// EAR below which the eyes are considered to be closing.
pub const DEFAULT_CLOSE_THRESHOLD: f32 = 0.21;

/// Dead-band added on top of the close threshold before a reopen counts.
pub const DEFAULT_REOPEN_MARGIN: f32 = 0.02;

/// Number of EAR samples kept for diagnostics.
pub const DEFAULT_HISTORY_LEN: usize = 10;

/// Floor for the horizontal eye span so a collapsed eye cannot divide by zero.
const MIN_EYE_SPAN: f32 = 1e-6;

/// Eye aspect ratio for one eye, landmarks ordered p1..p6.
///
/// EAR = (|p2 - p6| + |p3 - p5|) / (2 * |p1 - p4|)
pub fn eye_aspect_ratio(eye: &[Landmark; 6]) -> f32 {
    let [p1, p2, p3, p4, p5, p6] = eye;
    let vertical = p2.distance(p6) + p3.distance(p5);
    let horizontal = p1.distance(p4).max(MIN_EYE_SPAN);
    vertical / (2.0 * horizontal)
}

/// Mean EAR of both eyes, or `None` if the mesh lacks any eye landmark.
pub fn face_ear(face: &FaceLandmarks) -> Option<f32> {
    let left = eye_aspect_ratio(&face.eye(&LEFT_EYE)?);
    let right = eye_aspect_ratio(&face.eye(&RIGHT_EYE)?);
    Some((left + right) / 2.0)
}

/// Bounded rolling buffer of recent EAR samples, oldest dropped first.
///
/// Not consulted by [`BlinkDetector`]; kept for inspection and logging.
#[derive(Debug, Clone)]
pub struct EarHistory {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl EarHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, ear: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ear);
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for EarHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

/// What a single EAR sample did to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkEvent {
    /// No edge crossed.
    Steady,
    /// EAR fell below the close threshold.
    EyesClosing,
    /// A full close-then-reopen cycle completed. Latches the detector.
    Blink { count: u32 },
    /// A blink was already detected this session; the sample was ignored.
    Latched,
}

/// Snapshot of detector state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlinkState {
    pub closing: bool,
    pub blink_count: u32,
    pub detected: bool,
}

/// Hysteresis blink detector.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    close_threshold: f32,
    reopen_threshold: f32,
    state: BlinkState,
}

impl BlinkDetector {
    /// `reopen_margin` is added to `close_threshold` to get the reopen level.
    pub fn new(close_threshold: f32, reopen_margin: f32) -> Self {
        Self {
            close_threshold,
            reopen_threshold: close_threshold + reopen_margin.max(0.0),
            state: BlinkState::default(),
        }
    }

    pub fn close_threshold(&self) -> f32 {
        self.close_threshold
    }

    pub fn reopen_threshold(&self) -> f32 {
        self.reopen_threshold
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn is_latched(&self) -> bool {
        self.state.detected
    }

    pub fn observe(&mut self, ear: f32) -> BlinkEvent {
        if self.state.detected {
            return BlinkEvent::Latched;
        }

        if ear < self.close_threshold && !self.state.closing {
            self.state.closing = true;
            return BlinkEvent::EyesClosing;
        }

        if ear > self.reopen_threshold && self.state.closing {
            self.state.closing = false;
            self.state.blink_count += 1;
            self.state.detected = true;
            return BlinkEvent::Blink {
                count: self.state.blink_count,
            };
        }

        BlinkEvent::Steady
    }

    pub fn reset(&mut self) {
        self.state = BlinkState::default();
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSE_THRESHOLD, DEFAULT_REOPEN_MARGIN)
    }
}
