use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn, Level};

use clip_compositor::{
    composition::{ExportEngine, ExportOutcome, ExportRequest, Pacing},
    config::Config,
    presets::PresetRegistry,
    video::{check_ffmpeg_available, Container},
};

#[derive(Parser)]
#[command(
    name = "clip-compositor",
    version,
    about = "Play video clips back to back through a color preset and record the result",
    long_about = "Clip-Compositor plays a queue of video clips and still images in order, applies a pixel preset and an animated text overlay to every frame, and records everything into a single video file."
)]
struct Cli {
    /// Clips to play, in order (mp4, webm, mov, mkv, png, jpg, ...)
    clips: Vec<PathBuf>,

    /// Preset to apply (see --list-presets); unknown names mean no effect
    #[arg(short, long, default_value = "none")]
    preset: String,

    /// Overlay text drawn on every clip
    #[arg(short, long, default_value = "")]
    text: String,

    /// Soundtrack (accepted but not mixed into the output)
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Directory the recording is saved into
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Output container (webm, mp4, gif, raw)
    #[arg(long)]
    container: Option<Container>,

    /// Wait and preload the next clip before advancing
    #[arg(long)]
    crossfade: bool,

    /// Pace frames at the capture frame rate instead of as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Font for the overlay text
    #[arg(long)]
    font: Option<PathBuf>,

    /// List available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    if cli.list_presets {
        let registry = PresetRegistry::new();
        for name in registry.available_presets() {
            if let Some(preset) = registry.get_preset(&name) {
                println!("{:<12} {}", name, preset.description());
            }
        }
        return Ok(());
    }

    info!("Starting Clip-Compositor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            let mut config = Config::default();
            config.playback.pacing = Pacing::Unpaced;
            config
        }
    };

    if let Some(container) = cli.container {
        config.capture.container = container;
    }
    if cli.crossfade {
        config.playback.crossfade = true;
    }
    if cli.realtime {
        config.playback.pacing = Pacing::Realtime;
    }
    if let Some(font) = cli.font {
        config.overlay.font_path = Some(font);
    }
    config.validate()?;

    if config.capture.container.needs_ffmpeg() && !check_ffmpeg_available() {
        anyhow::bail!(
            "{} output needs ffmpeg and ffprobe on PATH; install them or pass --container gif",
            config.capture.container.extension()
        );
    }

    let mut engine = ExportEngine::from_config(config);

    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the recording so far...");
            cancel.cancel();
        }
    });

    let mut request = ExportRequest::new(cli.clips)
        .with_preset(cli.preset)
        .with_text(cli.text);
    request.audio = cli.audio;

    let outcome = match engine.export(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let path = outcome.artifact().save_to(&cli.out_dir)?;
    match outcome {
        ExportOutcome::Completed(_) => {
            info!("Export complete! Output saved to: {:?}", path);
            Ok(())
        }
        ExportOutcome::Aborted { error, .. } => {
            warn!("Partial recording saved to: {:?}", path);
            error!("{}", error.user_message());
            Err(error.into())
        }
    }
}
