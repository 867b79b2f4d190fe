use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod inspect;
mod login;
mod synth;
mod trace;
mod verify;

#[derive(Parser)]
#[command(name = "facegate", version, about = "Blink-gated face login tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full login session from a recorded landmark trace
    Login {
        /// JSON Lines file with one mesh frame per line
        #[arg(long)]
        trace: PathBuf,
        /// Still image used as the live video frame at capture time
        #[arg(long)]
        frame: PathBuf,
        /// Delay between replayed frames
        #[arg(long, default_value_t = 33)]
        frame_interval_ms: u64,
    },
    /// Submit one image to the verification service
    Verify {
        image: PathBuf,
        /// Upload the whole image instead of the circular face crop
        #[arg(long)]
        no_crop: bool,
    },
    /// Print per-frame EAR and blink detector events for a trace
    Inspect {
        #[arg(long)]
        trace: PathBuf,
    },
    /// Write a synthetic trace to stdout (e.g. --ear 0.3,0.3,0.15,0.3,none)
    Synth {
        #[arg(long, value_delimiter = ',', required = true)]
        ear: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Login {
            trace,
            frame,
            frame_interval_ms,
        } => login::run(trace, frame, frame_interval_ms).await,
        Command::Verify { image, no_crop } => verify::run(&image, !no_crop).await,
        Command::Inspect { trace } => inspect::run(&trace),
        Command::Synth { ear } => synth::run(&ear),
    }
}
