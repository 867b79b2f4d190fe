//! `facegate synth`: generate a synthetic landmark trace from EAR values.

use anyhow::{Context, Result};
use facegate_core::{FaceLandmarks, MeshFrame};

/// Parse one value: a number is an EAR for both eyes, `none` an empty frame.
fn parse_value(value: &str) -> Result<MeshFrame> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(MeshFrame::empty());
    }
    let ear: f32 = value
        .parse()
        .with_context(|| format!("invalid EAR value '{value}'"))?;
    Ok(MeshFrame::single(FaceLandmarks::synthetic(ear)))
}

pub fn render(values: &[String]) -> Result<String> {
    let mut out = String::new();
    for value in values {
        out.push_str(&serde_json::to_string(&parse_value(value)?)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn run(values: &[String]) -> Result<()> {
    print!("{}", render(values)?);
    Ok(())
}
