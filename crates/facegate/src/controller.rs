//! Blink-gated capture controller.
//!
//! Drives one face login: acquire the camera, watch the landmark stream for a
//! single blink, capture a circular crop of the frame on screen and hand it to
//! the verification service. Every exit path releases the camera and the
//! detector.
//!
//! Decisions are made on plain fields owned by the controller (status mirror,
//! blink detector). The [`SessionView`] published on the watch channel is
//! written after each decision and is only ever read by observers.

use facegate_core::{
    capture_face_jpeg, face_ear, BlinkDetector, BlinkEvent, CaptureError, EarHistory, MeshFrame,
};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::config::Config;
use crate::session::{
    Notice, SessionStatus, SessionView, MSG_BLINK_DETECTED, MSG_CAMERA_TIMEOUT, MSG_NO_MATCH,
    MSG_VERIFIED, MSG_VERIFY_FAILED,
};
use crate::source::{FrameSource, SourceError};
use crate::verifier::{Verifier, VerifyError, VerifyResponse};

/// Called with the matched teacher id once the service confirms a match.
pub type SuccessFn = Box<dyn FnOnce(String) + Send>;

const NOTICE_CAPACITY: usize = 16;

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("frame source error: {0}")]
    Source(#[from] SourceError),
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),
    #[error("camera did not start within {0:?}")]
    CameraTimeout(std::time::Duration),
    #[error("verification did not finish within {0:?}")]
    VerifyTimeout(std::time::Duration),
}

/// How [`FaceLogin::on_frame`] handled a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Not detecting, or a blink is already being captured.
    Ignored,
    /// No face, or a face without complete eye landmarks.
    NoFace,
    /// EAR sampled, no blink yet.
    Sampled { ear: f32 },
    /// First blink of the session. Capture should follow after the delay.
    BlinkDetected { ear: f32 },
}

/// Blink-gated face login controller.
pub struct FaceLogin<S: FrameSource, V: Verifier> {
    config: Config,
    source: S,
    verifier: V,
    on_success: Option<SuccessFn>,
    status: SessionStatus,
    blink: BlinkDetector,
    history: EarHistory,
    session_id: Option<Uuid>,
    view: watch::Sender<SessionView>,
    notices: broadcast::Sender<Notice>,
}

impl<S: FrameSource, V: Verifier> FaceLogin<S, V> {
    pub fn new(
        config: Config,
        source: S,
        verifier: V,
        on_success: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        let blink = BlinkDetector::new(config.ear_close_threshold, config.ear_reopen_margin);
        let history = EarHistory::new(config.ear_history_len);
        let (view, _) = watch::channel(SessionView::default());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            config,
            source,
            verifier,
            on_success: Some(Box::new(on_success)),
            status: SessionStatus::Idle,
            blink,
            history,
            session_id: None,
            view,
            notices,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// The current error message, if the last session failed.
    pub fn error(&self) -> Option<String> {
        self.view.borrow().error.clone()
    }

    pub fn blink_count(&self) -> u32 {
        self.blink.state().blink_count
    }

    pub fn ear_history(&self) -> &EarHistory {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Observe status, error and blink progress.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Receive user-facing notices emitted from now on.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Begin a new session. Safe to call at any time, including to retry.
    ///
    /// Returns the status reached: `Detecting` on success, `Idle` on failure.
    pub async fn start(&mut self) -> SessionStatus {
        // A previous attempt may still hold the camera.
        self.stop();

        self.blink.reset();
        self.history.clear();
        self.view.send_modify(|view| view.error = None);
        self.set_status(SessionStatus::Idle);

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        let settings = self.config.mesh_settings();
        tracing::info!(
            session = %session_id,
            width = settings.width,
            height = settings.height,
            "face login starting"
        );

        let timeout = self.config.camera_timeout;
        match tokio::time::timeout(timeout, self.source.open(&settings)).await {
            Ok(Ok(())) => {
                tracing::info!(session = %session_id, "camera and landmark detector ready");
                self.set_status(SessionStatus::Detecting);
            }
            Ok(Err(e)) => {
                tracing::error!(session = %session_id, error = %e, "failed to start camera");
                self.fail(e.user_message());
            }
            Err(_) => {
                let e = LoginError::CameraTimeout(timeout);
                tracing::error!(session = %session_id, error = %e, "failed to start camera");
                self.fail(MSG_CAMERA_TIMEOUT);
            }
        }

        self.status
    }

    /// Feed one processed frame through the blink detector.
    pub fn on_frame(&mut self, frame: &MeshFrame) -> FrameOutcome {
        if self.status != SessionStatus::Detecting || self.blink.is_latched() {
            return FrameOutcome::Ignored;
        }

        let Some(ear) = frame.primary_face().and_then(face_ear) else {
            return FrameOutcome::NoFace;
        };

        self.history.push(ear);
        tracing::debug!(ear, "frame sampled");

        match self.blink.observe(ear) {
            BlinkEvent::Blink { count } => {
                tracing::info!(
                    session = ?self.session_id,
                    ear,
                    count,
                    history_mean = ?self.history.mean(),
                    "blink detected"
                );
                self.set_status(SessionStatus::BlinkDetected);
                self.notify(Notice::info(MSG_BLINK_DETECTED));
                FrameOutcome::BlinkDetected { ear }
            }
            BlinkEvent::EyesClosing => {
                tracing::debug!(ear, "eyes closing");
                FrameOutcome::Sampled { ear }
            }
            BlinkEvent::Steady | BlinkEvent::Latched => FrameOutcome::Sampled { ear },
        }
    }

    /// Capture the frame on screen and verify it. Runs once per blink.
    pub async fn capture_and_verify(&mut self) -> SessionStatus {
        if self.status != SessionStatus::BlinkDetected {
            tracing::warn!(status = %self.status, "capture requested outside blink-detected");
            return self.status;
        }
        self.set_status(SessionStatus::Verifying);

        match self.submit_current_frame().await {
            Ok(response) => match response.matched_teacher() {
                Some(teacher_id) => {
                    let teacher_id = teacher_id.to_string();
                    tracing::info!(
                        session = ?self.session_id,
                        teacher_id = %teacher_id,
                        score = ?response.score,
                        "face verified"
                    );
                    self.stop();
                    self.set_status(SessionStatus::Complete);
                    self.notify(Notice::success(MSG_VERIFIED));
                    match self.on_success.take() {
                        Some(on_success) => on_success(teacher_id),
                        None => tracing::warn!("success callback already consumed"),
                    }
                }
                None => {
                    tracing::info!(
                        session = ?self.session_id,
                        score = ?response.score,
                        message = %response.message,
                        "no matching face"
                    );
                    self.fail(MSG_NO_MATCH);
                }
            },
            Err(e) => {
                tracing::warn!(session = ?self.session_id, error = %e, "face verification failed");
                self.fail(MSG_VERIFY_FAILED);
            }
        }

        self.status
    }

    /// Release the camera and the detector. Idempotent; never fails.
    pub fn stop(&mut self) {
        if let Err(e) = self.source.stop() {
            tracing::warn!(error = %e, "failed to stop camera driver");
        }
        if let Err(e) = self.source.close() {
            tracing::warn!(error = %e, "failed to close landmark detector");
        }
        if let Err(e) = self.source.release_tracks() {
            tracing::warn!(error = %e, "failed to release media tracks");
        }
    }

    /// Run a whole session: start, watch frames until a blink, wait the
    /// capture delay, then verify. Returns the final status.
    ///
    /// If the frame stream ends before a blink, the session stays in
    /// `Detecting`.
    pub async fn run(&mut self) -> SessionStatus {
        if self.start().await != SessionStatus::Detecting {
            return self.status;
        }

        loop {
            let frame = match self.source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(session = ?self.session_id, "frame stream ended before a blink");
                    return self.status;
                }
                Err(e) => {
                    tracing::error!(session = ?self.session_id, error = %e, "frame stream failed");
                    self.fail(e.user_message());
                    return self.status;
                }
            };

            if let FrameOutcome::BlinkDetected { .. } = self.on_frame(&frame) {
                tokio::time::sleep(self.config.capture_delay).await;
                return self.capture_and_verify().await;
            }
        }
    }

    async fn submit_current_frame(&mut self) -> Result<VerifyResponse, LoginError> {
        let frame = self.source.snapshot()?;
        let jpeg = capture_face_jpeg(&frame, self.config.crop_ratio, self.config.jpeg_quality)?;
        tracing::debug!(
            frame_width = frame.width(),
            frame_height = frame.height(),
            bytes = jpeg.len(),
            "face captured"
        );

        let timeout = self.config.verify_timeout;
        let response = tokio::time::timeout(timeout, self.verifier.verify(jpeg))
            .await
            .map_err(|_| LoginError::VerifyTimeout(timeout))??;
        Ok(response)
    }

    /// Release everything and go back to `Idle` with an error shown.
    fn fail(&mut self, message: &str) {
        self.stop();
        self.view.send_modify(|view| view.error = Some(message.to_string()));
        self.set_status(SessionStatus::Idle);
        self.notify(Notice::error(message));
    }

    fn set_status(&mut self, next: SessionStatus) {
        debug_assert!(
            self.status.can_advance_to(next),
            "illegal status transition {} -> {}",
            self.status,
            next
        );
        self.status = next;
        let blink_count = self.blink.state().blink_count;
        self.view.send_modify(|view| {
            view.status = next;
            view.blink_count = blink_count;
        });
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}

impl<S: FrameSource, V: Verifier> Drop for FaceLogin<S, V> {
    fn drop(&mut self) {
        self.stop();
    }
}
