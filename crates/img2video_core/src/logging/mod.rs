//! Logging infrastructure for img2video.
//!
//! This module provides:
//! - Global `tracing` subscriber setup for the CLI
//! - A per-job log file with encoder stderr tail capture
//!
//! # Example
//!
//! ```no_run
//! use img2video_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("frames", "/path/to/logs", LogConfig::default()).unwrap();
//!
//! logger.phase("Collect");
//! logger.command("ffmpeg -f image2pipe -i pipe:0 ...");
//! logger.success("Wrote out.mp4");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Adjusts the global log level after startup, e.g. once the config file
/// has been read.
pub struct TracingHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl TracingHandle {
    /// Switch to `level`. No-op when RUST_LOG set the filter.
    pub fn set_level(&self, level: LogLevel) -> Result<(), reload::Error> {
        if self.from_env {
            return Ok(());
        }
        self.filter.reload(EnvFilter::new(level.as_filter_str()))
    }
}

/// Initialize global tracing subscriber for application-wide logging.
///
/// RUST_LOG takes precedence over `default_level`. Output goes to stderr.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) -> TracingHandle {
    let (subscriber, handle) = build_subscriber(default_level, std::io::stderr);
    subscriber.init();
    handle
}

fn build_subscriber<W>(
    default_level: LogLevel,
    writer: W,
) -> (impl tracing::Subscriber + Send + Sync + 'static, TracingHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_level.as_filter_str()), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_target(false).with_ansi(false));

    (
        subscriber,
        TracingHandle {
            filter: handle,
            from_env,
        },
    )
}
