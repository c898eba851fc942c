use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use video_intro::capture::FfmpegAcquisition;
use video_intro::commands::{self, VideoIntroState};
use video_intro::processing::FfmpegDecoder;
use video_intro::{ErrorResponse, VideoIntroConfig};

#[derive(Parser)]
#[command(name = "video-intro")]
#[command(about = "Record, validate and inspect video introductions")]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a file through upload validation and print the artifact
    Inspect {
        file: PathBuf,

        /// Maximum allowed duration in minutes (1-10)
        #[arg(short, long, default_value = "1")]
        max_minutes: u32,

        /// Copy the generated thumbnail here
        #[arg(short, long)]
        thumbnail: Option<PathBuf>,
    },

    /// Record from the default camera and microphone
    Record {
        /// Seconds to record before stopping
        #[arg(short, long, default_value = "10")]
        seconds: u64,

        /// Maximum duration in minutes (1-10)
        #[arg(short, long, default_value = "1")]
        max_minutes: u32,

        /// Background effect id (see `backgrounds`)
        #[arg(short, long)]
        background: Option<String>,

        /// Where to write the recording
        #[arg(short, long, default_value = "video-intro.webm")]
        output: PathBuf,
    },

    /// List the available background effects
    Backgrounds,
}

#[tokio::main]
async fn main() -> Result<()> {
    video_intro::init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => VideoIntroConfig::load(path)?,
        None => VideoIntroConfig::default(),
    };

    match cli.command {
        Commands::Inspect {
            file,
            max_minutes,
            thumbnail,
        } => inspect(config, file, max_minutes, thumbnail).await,
        Commands::Record {
            seconds,
            max_minutes,
            background,
            output,
        } => record(config, seconds, max_minutes, background, output).await,
        Commands::Backgrounds => {
            let options = commands::effects::list_backgrounds();
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
    }
}

fn engine(config: VideoIntroConfig) -> VideoIntroState {
    VideoIntroState::new(
        config,
        Arc::new(FfmpegAcquisition::new()),
        Arc::new(FfmpegDecoder::new()),
    )
}

fn command_error(e: ErrorResponse) -> anyhow::Error {
    anyhow!("{} ({})", e.message, e.code)
}

async fn inspect(
    config: VideoIntroConfig,
    file: PathBuf,
    max_minutes: u32,
    thumbnail: Option<PathBuf>,
) -> Result<()> {
    let state = engine(config);
    let artifact = commands::recording::upload_video(
        &state,
        file.to_string_lossy().to_string(),
        max_minutes.saturating_mul(60),
    )
    .await
    .map_err(command_error)?;

    if let Some(dest) = thumbnail {
        let source = state
            .controller
            .urls()
            .resolve(&artifact.thumbnail)
            .context("thumbnail was revoked")?;
        std::fs::copy(&source, &dest)
            .with_context(|| format!("Failed to write thumbnail to {}", dest.display()))?;
        tracing::info!("Thumbnail written to {}", dest.display());
    }

    println!("{}", serde_json::to_string_pretty(&artifact)?);
    state.controller.reset();
    Ok(())
}

async fn record(
    config: VideoIntroConfig,
    seconds: u64,
    max_minutes: u32,
    background: Option<String>,
    output: PathBuf,
) -> Result<()> {
    let state = engine(config);

    if let Some(id) = background {
        commands::effects::set_background(&state, id)
            .await
            .map_err(command_error)?;
    }

    commands::recording::open_camera(&state)
        .await
        .map_err(command_error)?;
    let artifact = commands::recording::record_for(&state, max_minutes.saturating_mul(60), seconds)
        .await
        .map_err(|e| {
            state.controller.reset();
            command_error(e)
        })?;

    artifact
        .file
        .write_to(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{}", serde_json::to_string_pretty(&artifact)?);

    state.controller.reset();
    Ok(())
}
