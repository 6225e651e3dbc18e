//! Settings struct with TOML-based sections.
//!
//! Each section maps to one TOML table and can be rewritten on its own.

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// External encoder invocation.
    #[serde(default)]
    pub encoder: EncoderSettings,

    /// Job values used when the caller does not supply them.
    #[serde(default)]
    pub defaults: JobDefaults,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Sections of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Encoder,
    Defaults,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 3] = [
        ConfigSection::Encoder,
        ConfigSection::Defaults,
        ConfigSection::Logging,
    ];

    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Encoder => "encoder",
            ConfigSection::Defaults => "defaults",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the table when generating a fresh file.
    pub(super) fn description(&self) -> &'static str {
        match self {
            ConfigSection::Encoder => "External encoder process and fixed flags",
            ConfigSection::Defaults => "Job values used when not given on the command line",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

/// How the external encoder is invoked.
///
/// The frame rate, size and bitrate come from the job; everything here is
/// fixed per installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Encoder executable, looked up on PATH when not absolute.
    #[serde(default = "default_program")]
    pub program: String,

    /// Value for `-c:v`.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Input demuxer the concatenated image stream is declared as.
    #[serde(default = "default_input_format")]
    pub input_format: String,

    /// Value for `-pix_fmt`.
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Output muxer written to stdout.
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Encoder `-loglevel`.
    #[serde(default = "default_encoder_loglevel")]
    pub loglevel: String,

    /// Extra arguments inserted before the output format.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_program() -> String {
    "ffmpeg".to_string()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_input_format() -> String {
    "image2pipe".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_output_format() -> String {
    "mp4".to_string()
}

fn default_encoder_loglevel() -> String {
    "error".to_string()
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            video_codec: default_video_codec(),
            input_format: default_input_format(),
            pixel_format: default_pixel_format(),
            output_format: default_output_format(),
            loglevel: default_encoder_loglevel(),
            extra_args: Vec::new(),
        }
    }
}

/// Default job parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefaults {
    /// Output resolution as `<width>x<height>`.
    #[serde(default = "default_size")]
    pub size: String,

    /// Frames per second. Floored to an integer when passed to the encoder.
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// Video bitrate in bits per second.
    #[serde(default = "default_bitrate")]
    pub bitrate: u64,

    /// Output file name when none is given.
    #[serde(default = "default_output")]
    pub output: String,
}

fn default_size() -> String {
    "1920x1080".to_string()
}

fn default_fps() -> f64 {
    30.0
}

fn default_bitrate() -> u64 {
    4_000_000
}

fn default_output() -> String {
    "output.mp4".to_string()
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            size: default_size(),
            fps: default_fps(),
            bitrate: default_bitrate(),
            output: default_output(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when RUST_LOG is unset.
    #[serde(default)]
    pub level: LogLevel,

    /// Folder for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Write a per-job log file.
    #[serde(default)]
    pub write_job_log: bool,

    /// Number of encoder stderr lines kept for error reports.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Copy every encoder stderr line into the job log.
    #[serde(default)]
    pub echo_encoder_output: bool,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            logs_folder: default_logs_folder(),
            write_job_log: false,
            error_tail: default_error_tail(),
            echo_encoder_output: false,
        }
    }
}

impl LoggingSettings {
    /// Build the per-job logger configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            error_tail: self.error_tail as usize,
            echo_encoder_output: self.echo_encoder_output,
            ..LogConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.encoder.video_codec, "libx264");
        assert_eq!(settings.encoder.input_format, "image2pipe");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let settings: Settings =
            toml::from_str("[defaults]\nfps = 12.5\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(settings.defaults.fps, 12.5);
        assert_eq!(settings.defaults.size, "1920x1080");
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }

    #[test]
    fn log_config_carries_tail_size() {
        let logging = LoggingSettings {
            error_tail: 7,
            ..LoggingSettings::default()
        };
        assert_eq!(logging.to_log_config().error_tail, 7);
    }
}
