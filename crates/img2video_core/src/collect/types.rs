//! Types for image collection.

use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// One file carrying a frame index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    /// Index parsed from the file name.
    pub index: u64,
    /// File name as listed in the directory.
    pub file_name: String,
    /// Full path to the file.
    pub path: PathBuf,
}

/// Problems found while validating a frame sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Number of indexed files, i.e. the sequence must be `0..expected`.
    pub expected: usize,
    /// Indices in `0..expected` that no file carries.
    pub missing: Vec<u64>,
    /// Indices carried by more than one file, with those file names.
    pub duplicates: Vec<(u64, Vec<String>)>,
    /// Files whose index is `>= expected`.
    pub out_of_range: Vec<(u64, String)>,
}

/// Maximum number of items listed per category in the Display output.
const DISPLAY_LIMIT: usize = 10;

impl SequenceReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.duplicates.is_empty() && self.out_of_range.is_empty()
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame indices must be 0..{} with no gaps or repeats",
            self.expected
        )?;

        if !self.missing.is_empty() {
            let shown: Vec<String> = self
                .missing
                .iter()
                .take(DISPLAY_LIMIT)
                .map(|i| i.to_string())
                .collect();
            write!(f, "; missing {}", shown.join(", "))?;
            write_overflow(f, self.missing.len())?;
        }

        if !self.duplicates.is_empty() {
            let shown: Vec<String> = self
                .duplicates
                .iter()
                .take(DISPLAY_LIMIT)
                .map(|(index, names)| format!("{} ({})", index, names.join(", ")))
                .collect();
            write!(f, "; duplicate {}", shown.join(", "))?;
            write_overflow(f, self.duplicates.len())?;
        }

        if !self.out_of_range.is_empty() {
            let shown: Vec<String> = self
                .out_of_range
                .iter()
                .take(DISPLAY_LIMIT)
                .map(|(index, name)| format!("{} ({})", index, name))
                .collect();
            write!(f, "; out of range {}", shown.join(", "))?;
            write_overflow(f, self.out_of_range.len())?;
        }

        Ok(())
    }
}

fn write_overflow(f: &mut fmt::Formatter<'_>, total: usize) -> fmt::Result {
    if total > DISPLAY_LIMIT {
        write!(f, " and {} more", total - DISPLAY_LIMIT)?;
    }
    Ok(())
}

/// Errors from scanning and loading an image directory.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to read image directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read image file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid frame index '{token}' in file name '{file_name}': {source}")]
    InvalidIndex {
        file_name: String,
        token: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Invalid frame sequence: {0}")]
    InvalidSequence(SequenceReport),

    #[error("No numbered image files found in {}", path.display())]
    Empty { path: PathBuf },
}

/// Result type for collection operations.
pub type CollectResult<T> = Result<T, CollectError>;
