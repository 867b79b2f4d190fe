//! `facegate inspect`: show how the blink detector reads a trace.

use std::path::Path;

use anyhow::Result;
use facegate::Config;
use facegate_core::{face_ear, BlinkDetector, BlinkEvent, EarHistory, MeshFrame};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub index: usize,
    pub ear: Option<f32>,
    pub event: Option<BlinkEvent>,
    pub history_mean: Option<f32>,
}

pub fn analyse(frames: &[MeshFrame], config: &Config) -> Vec<FrameReport> {
    let mut detector = BlinkDetector::new(config.ear_close_threshold, config.ear_reopen_margin);
    let mut history = EarHistory::new(config.ear_history_len);

    frames
        .iter()
        .enumerate()
        .map(|(index, frame)| {
            let ear = frame.primary_face().and_then(face_ear);
            let event = ear.map(|ear| {
                history.push(ear);
                detector.observe(ear)
            });
            FrameReport {
                index,
                ear,
                event,
                history_mean: history.mean(),
            }
        })
        .collect()
}

pub fn run(trace: &Path) -> Result<()> {
    let config = Config::from_env();
    let frames = crate::trace::read_trace(trace)?;
    let reports = analyse(&frames, &config);

    println!(
        "close < {:.3}, reopen > {:.3}, {} frames",
        config.ear_close_threshold,
        config.ear_close_threshold + config.ear_reopen_margin,
        frames.len()
    );
    println!("{:>6}  {:>7}  {:>8}  event", "frame", "ear", "mean");
    for report in &reports {
        let ear = report.ear.map_or_else(|| "-".to_string(), |e| format!("{e:.4}"));
        let mean = report.history_mean.map_or_else(|| "-".to_string(), |m| format!("{m:.4}"));
        let event = match report.event {
            None => "no face",
            Some(BlinkEvent::Steady) => "",
            Some(BlinkEvent::EyesClosing) => "closing",
            Some(BlinkEvent::Blink { .. }) => "BLINK",
            Some(BlinkEvent::Latched) => "latched",
        };
        println!("{:>6}  {ear:>7}  {mean:>8}  {event}", report.index);
    }

    match reports.iter().find(|r| matches!(r.event, Some(BlinkEvent::Blink { .. }))) {
        Some(report) => println!("Blink completes at frame {}", report.index),
        None => println!("No blink detected"),
    }
    Ok(())
}
