//! Per-job logger.
//!
//! Each job gets a logger that:
//! - Writes to a dedicated log file (or nowhere, when detached)
//! - Keeps a tail of encoder stderr lines for error reports

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, MessagePrefix};

/// Per-job logger, safe to share between the encoder threads.
pub struct JobLogger {
    job_name: String,
    log_path: Option<PathBuf>,
    file_writer: Mutex<Option<BufWriter<File>>>,
    config: LogConfig,
    /// Most recent encoder output lines.
    tail_buffer: Mutex<VecDeque<String>>,
}

impl JobLogger {
    /// Create a logger writing to `<log_dir>/<job_name>.log`.
    ///
    /// The directory is created if missing. An existing log file for the
    /// same job name is truncated.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            job_name,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
        })
    }

    /// Create a logger with no backing file. Only the tail buffer is kept.
    pub fn detached(job_name: impl Into<String>, config: LogConfig) -> Self {
        Self {
            job_name: job_name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Path of the log file, if this logger has one.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.output(&self.format_message(message));
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log a phase marker.
    pub fn phase(&self, phase_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(phase_name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Record one line of encoder output.
    ///
    /// Lines always go into the tail buffer; they are written to the log
    /// only when `echo_encoder_output` is set.
    pub fn output_line(&self, line: &str) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail > 0 && buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            if self.config.error_tail > 0 {
                buffer.push_back(line.to_string());
            }
        }

        if self.config.echo_encoder_output {
            self.output(&self.format_message(&format!("[encoder] {}", line)));
        }
    }

    /// Write the tail buffer to the log under a header.
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Current tail buffer contents, oldest first.
    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
