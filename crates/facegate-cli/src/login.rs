//! `facegate login`: replay a recorded landmark trace through a full login session.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use facegate::{Config, FaceLogin, HttpVerifier, SessionStatus};
use tokio::sync::broadcast::error::RecvError;

use crate::trace::TraceSource;

pub async fn run(trace: PathBuf, frame: PathBuf, frame_interval_ms: u64) -> Result<()> {
    let config = Config::from_env();
    println!("Verification endpoint: {}", config.verify_url());

    let verifier = HttpVerifier::new(config.verify_url(), config.verify_timeout)
        .context("failed to set up verification client")?;
    let source = TraceSource::new(trace, frame, Duration::from_millis(frame_interval_ms));

    let teacher: Arc<Mutex<Option<String>>> = Arc::default();
    let sink = teacher.clone();
    let mut login = FaceLogin::new(config, source, verifier, move |teacher_id| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(teacher_id);
        }
    });

    let mut notices = login.notices();
    let printer = tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => println!("  [{:?}] {}", notice.level, notice.message),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let finished = tokio::select! {
        status = login.run() => Some(status),
        _ = tokio::signal::ctrl_c() => None,
    };
    let error = login.error();
    // Dropping the controller releases the camera and closes the notice channel.
    drop(login);
    printer.await.ok();

    let Some(status) = finished else {
        bail!("interrupted");
    };
    println!("Session status: {status}");

    match status {
        SessionStatus::Complete => {
            let teacher_id = teacher.lock().ok().and_then(|slot| slot.clone()).unwrap_or_default();
            println!("Logged in as teacher {teacher_id}");
            Ok(())
        }
        SessionStatus::Detecting => bail!("trace ended before a blink was detected"),
        _ => bail!(
            "login failed: {}",
            error.unwrap_or_else(|| "unknown error".to_string())
        ),
    }
}
