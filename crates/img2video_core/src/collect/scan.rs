//! Directory listing and frame index extraction.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{CollectError, CollectResult, FrameEntry};

/// First maximal run of ASCII digits.
static FRAME_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("frame index pattern is valid"));

/// Extract the frame index token from a file name.
///
/// Returns the leftmost run of ASCII decimal digits, or `None` if the
/// name has no digits.
pub fn frame_index(file_name: &str) -> Option<&str> {
    FRAME_INDEX.find(file_name).map(|m| m.as_str())
}

/// List the regular files in `dir` that carry a frame index.
///
/// Directories and other non-file entries are ignored, as are files whose
/// names contain no digits. The returned order is unspecified.
pub fn scan_directory(dir: &Path) -> CollectResult<Vec<FrameEntry>> {
    let read_dir_error = |source: std::io::Error| CollectError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();

    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let file_type = entry.file_type().map_err(read_dir_error)?;
        if !is_file(&entry, file_type) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(token) = frame_index(&file_name) else {
            tracing::debug!("Skipping '{}': no frame index in name", file_name);
            continue;
        };

        let index = token
            .parse::<u64>()
            .map_err(|source| CollectError::InvalidIndex {
                file_name: file_name.clone(),
                token: token.to_string(),
                source,
            })?;

        entries.push(FrameEntry {
            index,
            file_name,
            path: entry.path(),
        });
    }

    tracing::debug!(
        "Found {} numbered files in {}",
        entries.len(),
        dir.display()
    );

    Ok(entries)
}

/// Count the numbered files in `dir` without validating the sequence.
pub fn count_frames(dir: &Path) -> CollectResult<usize> {
    Ok(scan_directory(dir)?.len())
}

/// Regular file, or a symlink that resolves to one.
fn is_file(entry: &fs::DirEntry, file_type: fs::FileType) -> bool {
    if file_type.is_symlink() {
        return fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false);
    }
    file_type.is_file()
}
