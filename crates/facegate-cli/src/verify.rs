//! `facegate verify`: submit a single image to the verification service.

use std::path::Path;

use anyhow::{Context, Result};
use facegate::{Config, HttpVerifier, Verifier};
use facegate_core::{capture_face_jpeg, encode_jpeg};

pub async fn run(image_path: &Path, crop: bool) -> Result<()> {
    let config = Config::from_env();

    let frame = image::open(image_path)
        .with_context(|| format!("failed to open {}", image_path.display()))?
        .to_rgb8();
    let jpeg = if crop {
        capture_face_jpeg(&frame, config.crop_ratio, config.jpeg_quality)?
    } else {
        encode_jpeg(&frame, config.jpeg_quality)?
    };
    tracing::info!(bytes = jpeg.len(), crop, "image encoded");

    let verifier = HttpVerifier::new(config.verify_url(), config.verify_timeout)?;
    let response = verifier
        .verify(jpeg)
        .await
        .with_context(|| format!("verification against {} failed", verifier.url()))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
