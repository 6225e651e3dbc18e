//! img2video - assemble numbered images into a video file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use img2video_core::config::{ConfigManager, EncoderSettings, Settings};
use img2video_core::encoder::Encoder;
use img2video_core::logging::{init_tracing, JobLogger, LogLevel};
use img2video_core::{JobConfig, VideoJob};

#[derive(Parser, Debug)]
#[command(name = "img2video", version, about = "Assemble numbered images into a video")]
struct Args {
    /// Directory of numbered image files (frame_0.png, frame_1.png, ...)
    image_dir: PathBuf,

    /// Output video file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output resolution, e.g. 1920x1080
    #[arg(short, long)]
    size: Option<String>,

    /// Frames per second (floored to an integer)
    #[arg(short, long)]
    fps: Option<f64>,

    /// Video bitrate in bits per second
    #[arg(short, long)]
    bitrate: Option<u64>,

    /// Target video length in seconds; derives the frame rate from the image count
    #[arg(short, long, conflicts_with = "fps")]
    length: Option<u64>,

    /// Settings file, created with defaults if missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Write a per-job log file into this directory
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_handle = init_tracing(args.log_level.unwrap_or_default());
    let settings = load_settings(args.config.as_deref())?;
    if args.log_level.is_none() {
        log_handle
            .set_level(settings.logging.level)
            .context("Failed to apply configured log level")?;
    }

    check_encoder(&settings.encoder)?;

    let mut config = JobConfig::from_defaults(&args.image_dir, &settings.defaults);
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(size) = args.size {
        config.size = size;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(bitrate) = args.bitrate {
        config.bitrate = bitrate;
    }

    let mut job = VideoJob::new(config, settings.encoder.clone())
        .with_context(|| format!("Failed to load images from {}", args.image_dir.display()))?;

    if let Some(seconds) = args.length {
        let fps = job.set_length(seconds)?;
        tracing::info!("Frame rate set to {:.3} for a {}s video", fps, seconds);
    }

    let logs_dir = args.logs_dir.or_else(|| {
        settings
            .logging
            .write_job_log
            .then(|| PathBuf::from(&settings.logging.logs_folder))
    });
    let log_config = settings.logging.to_log_config();
    let logger = match logs_dir {
        Some(dir) => JobLogger::new(job.name(), &dir, log_config)
            .with_context(|| format!("Failed to create job log in {}", dir.display()))?,
        None => JobLogger::detached(job.name(), log_config),
    };

    let outcome = job.encode(&logger).context("Encoding failed")?;

    if let Some(log_path) = logger.log_path() {
        tracing::info!("Job log: {}", log_path.display());
    }
    println!("{}", outcome.output_path.display());
    Ok(())
}

/// Fail fast when the encoder program cannot be run, before any image is read.
fn check_encoder(settings: &EncoderSettings) -> Result<()> {
    if !Encoder::new(settings.clone()).is_available() {
        bail!(
            "Encoder '{}' could not be run; install it or set [encoder] program",
            settings.program
        );
    }
    Ok(())
}

/// Settings from `path`, or built-in defaults when no file is given.
fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };

    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    Ok(manager.settings().clone())
}
