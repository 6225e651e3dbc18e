//! Configuration management for img2video.
//!
//! This module provides:
//! - TOML-based configuration with `[encoder]`, `[defaults]` and `[logging]` sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only the changed table is rewritten)
//!
//! # Example
//!
//! ```no_run
//! use img2video_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/img2video.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Encoder: {}", config.settings().encoder.program);
//!
//! config.settings_mut().encoder.video_codec = "libx265".to_string();
//! config.update_section(ConfigSection::Encoder).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, EncoderSettings, JobDefaults, LoggingSettings, Settings};
