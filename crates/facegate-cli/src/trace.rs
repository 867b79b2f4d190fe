//! Recorded landmark traces and a [`FrameSource`] that replays them.
//!
//! A trace is JSON Lines: one [`MeshFrame`] per line, e.g.
//! `{"faces":[[{"x":0.41,"y":0.42}, ...]]}`. Blank lines are skipped. The
//! still image passed alongside stands in for the live video frame that gets
//! captured after the blink.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use facegate::{FrameSource, MeshSettings, SourceError};
use facegate_core::MeshFrame;
use image::imageops::FilterType;
use image::RgbImage;

pub fn parse_trace(text: &str) -> Result<Vec<MeshFrame>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid frame on line {}", i + 1))
        })
        .collect()
}

pub fn read_trace(path: &Path) -> Result<Vec<MeshFrame>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&text).with_context(|| format!("failed to parse trace {}", path.display()))
}

/// Replays a trace file at a fixed frame interval.
pub struct TraceSource {
    trace_path: PathBuf,
    frame_path: PathBuf,
    interval: Duration,
    frames: VecDeque<MeshFrame>,
    still: Option<RgbImage>,
    driver_running: bool,
}

impl TraceSource {
    pub fn new(trace_path: PathBuf, frame_path: PathBuf, interval: Duration) -> Self {
        Self {
            trace_path,
            frame_path,
            interval,
            frames: VecDeque::new(),
            still: None,
            driver_running: false,
        }
    }
}

fn io_to_source(e: std::io::Error, what: &Path) -> SourceError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => SourceError::PermissionDenied,
        _ => SourceError::Unavailable(format!("{}: {e}", what.display())),
    }
}

impl FrameSource for TraceSource {
    async fn open(&mut self, settings: &MeshSettings) -> Result<(), SourceError> {
        let bytes = tokio::fs::read(&self.frame_path)
            .await
            .map_err(|e| io_to_source(e, &self.frame_path))?;
        let still = image::load_from_memory(&bytes)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", self.frame_path.display())))?
            .to_rgb8();
        // The camera is asked for a fixed resolution; honour it.
        let still = if still.dimensions() == (settings.width, settings.height) {
            still
        } else {
            image::imageops::resize(&still, settings.width, settings.height, FilterType::Triangle)
        };
        self.still = Some(still);

        let text = tokio::fs::read_to_string(&self.trace_path)
            .await
            .map_err(|e| io_to_source(e, &self.trace_path))?;
        let frames = parse_trace(&text).map_err(|e| SourceError::DetectorInit(format!("{e:#}")))?;
        tracing::info!(
            trace = %self.trace_path.display(),
            frames = frames.len(),
            max_faces = settings.max_faces,
            "trace loaded"
        );
        self.frames = frames.into();
        self.driver_running = true;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<MeshFrame>, SourceError> {
        if !self.driver_running {
            return Err(SourceError::NotReady);
        }
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        Ok(self.frames.pop_front())
    }

    fn snapshot(&mut self) -> Result<RgbImage, SourceError> {
        self.still.clone().ok_or(SourceError::NotReady)
    }

    fn stop(&mut self) -> Result<(), SourceError> {
        self.driver_running = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.frames.clear();
        Ok(())
    }

    fn release_tracks(&mut self) -> Result<(), SourceError> {
        self.still = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate::Config;
    use facegate_core::FaceLandmarks;
    use std::io::Write;

    fn write_trace(frames: &[MeshFrame]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for frame in frames {
            writeln!(file, "{}", serde_json::to_string(frame).unwrap()).unwrap();
        }
        file
    }

    fn write_still() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        RgbImage::from_pixel(320, 240, image::Rgb([90, 90, 90]))
            .save(file.path())
            .unwrap();
        file
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let text = "{\"faces\":[]}\n\n   \n{}\n";
        let frames = parse_trace(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.faces.is_empty()));
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_trace("{}\n{oops}\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[tokio::test]
    async fn test_replay_and_release() {
        let frames = vec![
            MeshFrame::single(FaceLandmarks::synthetic(0.3)),
            MeshFrame::empty(),
        ];
        let trace = write_trace(&frames);
        let still = write_still();
        let settings = Config::default().mesh_settings();

        let mut source = TraceSource::new(trace.path().into(), still.path().into(), Duration::ZERO);
        source.open(&settings).await.unwrap();

        assert_eq!(source.snapshot().unwrap().dimensions(), (640, 480));
        assert_eq!(source.next_frame().await.unwrap(), Some(frames[0].clone()));
        assert_eq!(source.next_frame().await.unwrap(), Some(MeshFrame::empty()));
        assert_eq!(source.next_frame().await.unwrap(), None);

        for _ in 0..2 {
            source.stop().unwrap();
            source.close().unwrap();
            source.release_tracks().unwrap();
        }
        assert!(matches!(source.snapshot(), Err(SourceError::NotReady)));
        assert!(matches!(source.next_frame().await, Err(SourceError::NotReady)));
    }

    #[tokio::test]
    async fn test_missing_still_is_unavailable() {
        let trace = write_trace(&[]);
        let mut source = TraceSource::new(
            trace.path().into(),
            PathBuf::from("/nonexistent/still.png"),
            Duration::ZERO,
        );
        let err = source.open(&Config::default().mesh_settings()).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
