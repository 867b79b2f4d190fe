//! In-memory frame source and verifier for controller tests, plus a one-shot
//! HTTP responder for the verification client.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use facegate_core::{FaceLandmarks, MeshFrame};
use image::{Rgb, RgbImage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::source::{FrameSource, MeshSettings, SourceError};
use crate::verifier::{Verifier, VerifyError, VerifyResponse};

const OPEN_EAR: f32 = 0.30;
const CLOSED_EAR: f32 = 0.15;

pub fn frames_from_ears(ears: &[f32]) -> Vec<MeshFrame> {
    ears.iter()
        .map(|&ear| MeshFrame::single(FaceLandmarks::synthetic(ear)))
        .collect()
}

/// `total` open-eye frames with a blink closing at `at` and reopening at `at + 1`.
pub fn blink_at(at: usize, total: usize) -> Vec<MeshFrame> {
    let ears: Vec<f32> = (0..total)
        .map(|i| if i == at { CLOSED_EAR } else { OPEN_EAR })
        .collect();
    frames_from_ears(&ears)
}

/// Resource counters shared between a [`FakeSource`] and the test.
#[derive(Default)]
pub struct SourceCounters {
    active_tracks: AtomicUsize,
    open_detectors: AtomicUsize,
    running_drivers: AtomicUsize,
    opens: AtomicUsize,
    snapshots: AtomicUsize,
    frames_delivered: AtomicUsize,
}

impl SourceCounters {
    pub fn active_tracks(&self) -> usize {
        self.active_tracks.load(Ordering::SeqCst)
    }

    pub fn open_detectors(&self) -> usize {
        self.open_detectors.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn snapshots(&self) -> usize {
        self.snapshots.load(Ordering::SeqCst)
    }

    pub fn frames_delivered(&self) -> usize {
        self.frames_delivered.load(Ordering::SeqCst)
    }
}

/// Replays a fixed frame list. Open acquires one track and one detector,
/// which a real camera would leak if the controller forgot to release them.
pub struct FakeSource {
    frames: Vec<MeshFrame>,
    cursor: usize,
    counters: Arc<SourceCounters>,
    deny_permission: bool,
    fail_detector: bool,
    fail_release: bool,
    has_video: bool,
    fail_stream_after: Option<usize>,
    open_latency: Duration,
}

impl FakeSource {
    pub fn new(frames: Vec<MeshFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            counters: Arc::default(),
            deny_permission: false,
            fail_detector: false,
            fail_release: false,
            has_video: true,
            fail_stream_after: None,
            open_latency: Duration::ZERO,
        }
    }

    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    pub fn fail_detector(mut self) -> Self {
        self.fail_detector = true;
        self
    }

    pub fn fail_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn without_video(mut self) -> Self {
        self.has_video = false;
        self
    }

    pub fn fail_stream_after(mut self, frames: usize) -> Self {
        self.fail_stream_after = Some(frames);
        self
    }

    /// Camera acquired at once, detector ready only after `latency`.
    pub fn with_open_latency(mut self, latency: Duration) -> Self {
        self.open_latency = latency;
        self
    }

    pub fn counters(&self) -> Arc<SourceCounters> {
        self.counters.clone()
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl FrameSource for FakeSource {
    async fn open(&mut self, settings: &MeshSettings) -> Result<(), SourceError> {
        assert_eq!(settings.max_faces, 1);
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if self.deny_permission {
            return Err(SourceError::PermissionDenied);
        }
        self.counters.active_tracks.fetch_add(1, Ordering::SeqCst);
        if !self.open_latency.is_zero() {
            tokio::time::sleep(self.open_latency).await;
        }
        if self.fail_detector {
            return Err(SourceError::DetectorInit("model failed to load".into()));
        }
        self.counters.open_detectors.fetch_add(1, Ordering::SeqCst);
        self.counters.running_drivers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<MeshFrame>, SourceError> {
        if let Some(limit) = self.fail_stream_after {
            if self.cursor >= limit {
                return Err(SourceError::Stream("device disconnected".into()));
            }
        }
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
            self.counters.frames_delivered.fetch_add(1, Ordering::SeqCst);
        }
        Ok(frame)
    }

    fn snapshot(&mut self) -> Result<RgbImage, SourceError> {
        if !self.has_video || self.counters.active_tracks() == 0 {
            return Err(SourceError::NotReady);
        }
        self.counters.snapshots.fetch_add(1, Ordering::SeqCst);
        Ok(RgbImage::from_pixel(640, 480, Rgb([180, 150, 130])))
    }

    fn stop(&mut self) -> Result<(), SourceError> {
        self.counters.running_drivers.store(0, Ordering::SeqCst);
        if self.fail_release {
            return Err(SourceError::Release("camera driver stop failed".into()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.counters.open_detectors.store(0, Ordering::SeqCst);
        if self.fail_release {
            return Err(SourceError::Release("detector close failed".into()));
        }
        Ok(())
    }

    fn release_tracks(&mut self) -> Result<(), SourceError> {
        self.counters.active_tracks.store(0, Ordering::SeqCst);
        if self.fail_release {
            return Err(SourceError::Release("track stop failed".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

type Scripted = Result<VerifyResponse, u16>;

/// Answers from a script; the last entry repeats. `Err(status)` becomes an
/// HTTP status error.
pub struct FakeVerifier {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    latency: Duration,
    calls: CallCounter,
    uploads: Arc<Mutex<Vec<Vec<u8>>>>,
    call_times: Arc<Mutex<Vec<tokio::time::Instant>>>,
    in_flight: AtomicBool,
}

impl FakeVerifier {
    pub fn sequence(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            latency: Duration::ZERO,
            calls: CallCounter::default(),
            uploads: Arc::default(),
            call_times: Arc::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn returning(response: VerifyResponse) -> Self {
        Self::sequence(vec![Ok(response)])
    }

    pub fn failing(status: u16) -> Self {
        Self::sequence(vec![Err(status)])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    pub fn uploads(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.uploads.clone()
    }

    pub fn call_times(&self) -> Arc<Mutex<Vec<tokio::time::Instant>>> {
        self.call_times.clone()
    }

    fn next_answer(&self) -> Scripted {
        let mut script = self.script.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(answer) = script.pop_front() {
            *last = Some(answer.clone());
            return answer;
        }
        last.clone().expect("fake verifier has no scripted answer")
    }
}

impl Verifier for FakeVerifier {
    async fn verify(&self, jpeg: Vec<u8>) -> Result<VerifyResponse, VerifyError> {
        assert!(
            !self.in_flight.swap(true, Ordering::SeqCst),
            "overlapping verification requests"
        );
        self.calls.0.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(tokio::time::Instant::now());
        self.uploads.lock().unwrap().push(jpeg);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let answer = self.next_answer();
        self.in_flight.store(false, Ordering::SeqCst);
        answer.map_err(|status| VerifyError::Status { status })
    }
}

/// Serve exactly one HTTP response and hand back the raw request bytes.
pub async fn serve_once(
    status_line: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        let response = format!(
            "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\
             connection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (format!("http://{addr}/face/verify-quick"), handle)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let headers = text[..header_end].to_ascii_lowercase();
    if headers.contains("transfer-encoding: chunked") {
        return text.ends_with("0\r\n\r\n");
    }
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}
