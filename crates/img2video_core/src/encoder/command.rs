//! Encoder command line construction.

use std::process::Command;

use super::types::{EncodeError, EncodeParams, EncodeResult};
use crate::config::EncoderSettings;

/// Output formats that need fragmenting to be written to a pipe.
const SEEKLESS_FORMATS: &[&str] = &["mp4", "mov", "ismv"];

/// A fully resolved encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    program: String,
    args: Vec<String>,
}

impl EncoderCommand {
    /// Build the encoder invocation for one job.
    ///
    /// Input is the concatenated image stream on stdin, output is the
    /// encoded container on stdout.
    pub fn build(settings: &EncoderSettings, params: &EncodeParams) -> EncodeResult<Self> {
        let frame_rate = params.frame_rate()?.to_string();
        params.dimensions()?;
        if params.bitrate == 0 {
            return Err(EncodeError::invalid_argument("bitrate must be positive"));
        }
        let bitrate = params.bitrate.to_string();

        let mut args: Vec<String> = Vec::new();
        push(
            &mut args,
            &["-hide_banner", "-loglevel", settings.loglevel.as_str()],
        );

        // Input: image sequence over stdin
        push(
            &mut args,
            &[
                "-f",
                settings.input_format.as_str(),
                "-framerate",
                frame_rate.as_str(),
                "-i",
                "pipe:0",
            ],
        );

        // Video encoding
        push(
            &mut args,
            &[
                "-c:v",
                settings.video_codec.as_str(),
                "-b:v",
                bitrate.as_str(),
                "-r",
                frame_rate.as_str(),
                "-s",
                params.size.trim(),
                "-pix_fmt",
                settings.pixel_format.as_str(),
            ],
        );

        if SEEKLESS_FORMATS.contains(&settings.output_format.as_str()) {
            push(&mut args, &["-movflags", "frag_keyframe+empty_moov"]);
        }

        let extra: Vec<&str> = settings.extra_args.iter().map(String::as_str).collect();
        push(&mut args, &extra);

        // Output: container on stdout
        push(&mut args, &["-f", settings.output_format.as_str(), "pipe:1"]);

        Ok(Self {
            program: settings.program.clone(),
            args,
        })
    }

    /// Wrap an arbitrary program and argument list.
    pub fn from_parts(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A `Command` with program and arguments set; stdio is left to the caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn push(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
