//! Encoder pipeline.
//!
//! Pipes a [`FrameBuffer`] through an external encoder process (ffmpeg by
//! default) and writes the encoded container to disk.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use img2video_core::collect::collect_frames;
//! use img2video_core::config::EncoderSettings;
//! use img2video_core::encoder::{EncodeParams, Encoder};
//! use img2video_core::logging::{JobLogger, LogConfig};
//!
//! let frames = collect_frames("frames/").unwrap();
//! let params = EncodeParams { size: "1920x1080".into(), fps: 30.0, bitrate: 4_000_000 };
//! let logger = JobLogger::detached("frames", LogConfig::default());
//!
//! let outcome = Encoder::new(EncoderSettings::default())
//!     .encode(&frames, &params, Path::new("out.mp4"), &logger)
//!     .unwrap();
//! println!("{} bytes", outcome.bytes_written);
//! ```

mod command;
mod output;
mod runner;
mod types;

pub use command::EncoderCommand;
pub use output::write_output;
pub use runner::run_encoder;
pub use types::{parse_size, EncodeError, EncodeOutcome, EncodeParams, EncodeResult};

use std::path::Path;
use std::process::{Command, Stdio};

use crate::collect::FrameBuffer;
use crate::config::EncoderSettings;
use crate::logging::JobLogger;

/// Encoder with fixed per-installation settings.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    settings: EncoderSettings,
}

impl Encoder {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Check whether the encoder program can be run.
    pub fn is_available(&self) -> bool {
        Command::new(&self.settings.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Resolve the command line for `params`.
    pub fn command(&self, params: &EncodeParams) -> EncodeResult<EncoderCommand> {
        EncoderCommand::build(&self.settings, params)
    }

    /// Encode `frames` and write the result to `output`.
    ///
    /// Nothing is written unless the encoder exits successfully with
    /// non-empty output.
    pub fn encode(
        &self,
        frames: &FrameBuffer,
        params: &EncodeParams,
        output: &Path,
        logger: &JobLogger,
    ) -> EncodeResult<EncodeOutcome> {
        let command = self.command(params)?;

        logger.phase("Encode");
        logger.info(&format!(
            "{} frames ({} bytes) at {} fps, {}, {} bit/s",
            frames.frame_count(),
            frames.len(),
            params.fps,
            params.size,
            params.bitrate
        ));
        logger.command(&command.display());
        tracing::debug!("Running encoder: {}", command.display());

        let encoded = match run_encoder(&command, frames.as_bytes(), logger) {
            Ok(encoded) => encoded,
            Err(e) => {
                logger.show_tail(command.program());
                logger.error(&e.to_string());
                return Err(e);
            }
        };

        write_output(output, &encoded)?;

        logger.success(&format!(
            "Wrote {} bytes to {}",
            encoded.len(),
            output.display()
        ));

        Ok(EncodeOutcome {
            output_path: output.to_path_buf(),
            bytes_written: encoded.len(),
            frames: frames.frame_count(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn params() -> EncodeParams {
        EncodeParams {
            size: "64x64".to_string(),
            fps: 10.0,
            bitrate: 100_000,
        }
    }

    fn frames(dir: &Path) -> FrameBuffer {
        let frames_dir = dir.join("frames");
        fs::create_dir(&frames_dir).unwrap();
        fs::write(frames_dir.join("f0.png"), b"first").unwrap();
        fs::write(frames_dir.join("f1.png"), b"second").unwrap();
        crate::collect::collect_frames(&frames_dir).unwrap()
    }

    #[test]
    fn failed_encode_writes_nothing() {
        let dir = tempdir().unwrap();
        let settings = EncoderSettings {
            program: script(dir.path(), "enc", "cat >/dev/null; echo 'Unknown encoder' >&2; exit 1"),
            ..EncoderSettings::default()
        };
        let output = dir.path().join("out.mp4");
        let logger = JobLogger::detached("job", LogConfig::default());

        let result = Encoder::new(settings).encode(&frames(dir.path()), &params(), &output, &logger);

        assert!(matches!(result, Err(EncodeError::ProcessFailed { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn invalid_params_fail_before_spawning() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let logger = JobLogger::detached("job", LogConfig::default());
        let mut params = params();
        params.fps = 0.0;

        let result = Encoder::default().encode(&frames(dir.path()), &params, &output, &logger);
        assert!(matches!(result, Err(EncodeError::InvalidArgument(_))));
    }

    #[test]
    fn successful_encode_reports_outcome() {
        let dir = tempdir().unwrap();
        let settings = EncoderSettings {
            program: script(dir.path(), "enc", "exec cat"),
            ..EncoderSettings::default()
        };
        let output = dir.path().join("out.mp4");
        let logger = JobLogger::detached("job", LogConfig::default());

        let outcome = Encoder::new(settings)
            .encode(&frames(dir.path()), &params(), &output, &logger)
            .unwrap();

        assert_eq!(outcome.frames, 2);
        assert_eq!(outcome.bytes_written, 11);
        assert_eq!(fs::read(&output).unwrap(), b"firstsecond");
    }

    #[test]
    fn missing_program_is_unavailable() {
        let encoder = Encoder::new(EncoderSettings {
            program: "/nonexistent/ffmpeg".to_string(),
            ..EncoderSettings::default()
        });
        assert!(!encoder.is_available());
    }
}
