//! img2video core
//!
//! Assembles a directory of numbered image files into a single video by
//! piping their concatenated bytes through an external encoder. No UI
//! dependencies; the `img2video` binary is a thin wrapper over [`VideoJob`].

pub mod collect;
pub mod config;
pub mod encoder;
pub mod error;
pub mod job;
pub mod logging;

pub use error::{Error, Result};
pub use job::{JobConfig, VideoJob};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
