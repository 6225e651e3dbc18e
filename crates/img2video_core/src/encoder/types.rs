//! Types for the encoder pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Per-job encoding parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    /// Output resolution as `<width>x<height>`.
    pub size: String,
    /// Frames per second; floored when passed to the encoder.
    pub fps: f64,
    /// Video bitrate in bits per second.
    pub bitrate: u64,
}

impl EncodeParams {
    /// Integer frame rate handed to the encoder.
    ///
    /// Fails if the floored rate is below 1 or `fps` is not finite.
    pub fn frame_rate(&self) -> EncodeResult<u32> {
        if !self.fps.is_finite() {
            return Err(EncodeError::invalid_argument(format!(
                "frame rate must be finite, got {}",
                self.fps
            )));
        }

        let floored = self.fps.floor();
        if floored < 1.0 || floored > u32::MAX as f64 {
            return Err(EncodeError::invalid_argument(format!(
                "frame rate {} floors to {}, expected at least 1",
                self.fps, floored
            )));
        }

        Ok(floored as u32)
    }

    /// Parse `size` into width and height.
    pub fn dimensions(&self) -> EncodeResult<(u32, u32)> {
        parse_size(&self.size)
    }
}

/// Parse a `<width>x<height>` string with positive dimensions.
pub fn parse_size(size: &str) -> EncodeResult<(u32, u32)> {
    let invalid = || EncodeError::invalid_argument(format!("size '{}' is not WIDTHxHEIGHT", size));

    let (w, h) = size.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = w.parse().map_err(|_| invalid())?;
    let height: u32 = h.parse().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}

/// Result of a successful encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    pub output_path: PathBuf,
    pub bytes_written: usize,
    /// Number of input frames fed to the encoder.
    pub frames: usize,
}

/// Errors from running the encoder and writing its output.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to start encoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Encoder pipe error while {stage}: {source}")]
    Pipe {
        stage: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed with {}: {}", describe_exit(.exit_code), last_line(.stderr_tail))]
    ProcessFailed {
        program: String,
        exit_code: Option<i32>,
        /// Last lines the encoder wrote to stderr.
        stderr_tail: Vec<String>,
    },

    #[error("{program} exited successfully but produced no output")]
    EmptyOutput { program: String },

    #[error("{program} stopped reading input before all {input_len} bytes were written")]
    InputTruncated { program: String, input_len: usize },

    #[error("Encoder worker thread panicked")]
    WorkerPanicked,

    #[error("Failed to write output file {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl EncodeError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(super) fn pipe(stage: &'static str, source: io::Error) -> Self {
        Self::Pipe { stage, source }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn last_line(tail: &[String]) -> &str {
    tail.iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or("no diagnostic output")
}

/// Result type for encoder operations.
pub type EncodeResult<T> = Result<T, EncodeError>;
