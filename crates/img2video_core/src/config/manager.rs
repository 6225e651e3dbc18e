//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates that leave other tables and comments untouched
//! - Missing keys are filled with defaults on load

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages the settings file.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a manager for the given path. Nothing is read until
    /// `load()` or `load_or_create()` is called.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access to the in-memory settings.
    ///
    /// Changes are only persisted by `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file. Fails if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if it doesn't exist.
    ///
    /// An existing file missing some keys is rewritten with the defaults
    /// filled in.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_and_check(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::debug!(
                    "Filling missing config keys in {}",
                    self.config_path.display()
                );
                self.save()?;
            }
        } else {
            tracing::info!("Creating default config at {}", self.config_path.display());
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Rewrite one section atomically.
    ///
    /// The file is re-read from disk and only the target table is
    /// replaced, so edits to other tables survive.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = section_toml(&self.settings, section)?.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# img2video configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::ALL {
            output.push('\n');
            output.push_str(&format!("# {}\n", section.description()));
            output.push_str(&format!("[{}]\n", section.table_name()));
            for line in section_toml(&self.settings, section)?.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    /// Write content to the config file via a temp file and rename.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}

/// Parse settings and report whether the file needs rewriting
/// (unknown tables or keys left to defaults).
fn parse_and_check(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings: Settings = toml::from_str(content)?;

    let known: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
    let has_unknown = doc.iter().any(|(key, _)| !known.contains(&key));

    let mut missing_keys = false;
    for section in ConfigSection::ALL {
        let expected = expected_key_count(&settings, section)?;
        missing_keys |= match doc.get(section.table_name()).and_then(Item::as_table) {
            Some(table) => table.len() < expected,
            None => true,
        };
    }

    Ok((settings, has_unknown || missing_keys))
}

fn expected_key_count(settings: &Settings, section: ConfigSection) -> ConfigResult<usize> {
    let table: toml::Table = toml::from_str(&section_toml(settings, section)?)?;
    Ok(table.len())
}

/// Serialize one section's table body.
fn section_toml(settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
    let content = match section {
        ConfigSection::Encoder => toml::to_string_pretty(&settings.encoder)?,
        ConfigSection::Defaults => toml::to_string_pretty(&settings.defaults)?,
        ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
    };
    Ok(content)
}
