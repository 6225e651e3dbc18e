//! Output file writing.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::{EncodeError, EncodeResult};

/// Permission bits of the finished video file.
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Write `bytes` to `path` in one piece.
///
/// The data goes to a temp file next to `path`, which is renamed over the
/// destination once fully written, so readers never see a partial file.
/// The parent directory must already exist.
pub fn write_output(path: &Path, bytes: &[u8]) -> EncodeResult<()> {
    let temp_path = temp_path_for(path);
    let written = write_temp(&temp_path, bytes).and_then(|()| fs::rename(&temp_path, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(EncodeError::WriteOutput {
            path: path.to_path_buf(),
            source,
        });
    }

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn write_temp(temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Set explicitly so the process umask doesn't change the result.
        fs::set_permissions(temp_path, fs::Permissions::from_mode(OUTPUT_MODE))?;
    }

    Ok(())
}

/// `dir/.name.tmp` for `dir/name`.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
