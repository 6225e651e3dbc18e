//! Validated frame ordering and buffer loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::scan::scan_directory;
use super::types::{CollectError, CollectResult, FrameEntry, SequenceReport};

/// Dense, ordered set of frame files.
///
/// Entry `i` always carries frame index `i`.
#[derive(Debug, Clone)]
pub struct ImageSet {
    directory: PathBuf,
    entries: Vec<FrameEntry>,
}

impl ImageSet {
    /// Scan `dir` and validate the frame sequence.
    pub fn scan(dir: impl AsRef<Path>) -> CollectResult<Self> {
        let dir = dir.as_ref();
        let entries = scan_directory(dir)?;
        Self::from_entries(dir, entries)
    }

    /// Order `entries` by frame index, requiring each of `0..entries.len()`
    /// exactly once.
    pub fn from_entries(dir: impl Into<PathBuf>, entries: Vec<FrameEntry>) -> CollectResult<Self> {
        let directory = dir.into();
        let expected = entries.len();

        if expected == 0 {
            return Err(CollectError::Empty { path: directory });
        }

        let mut by_index: BTreeMap<u64, Vec<FrameEntry>> = BTreeMap::new();
        for entry in entries {
            by_index.entry(entry.index).or_default().push(entry);
        }

        let mut report = SequenceReport {
            expected,
            ..SequenceReport::default()
        };

        report.missing = (0..expected as u64)
            .filter(|i| !by_index.contains_key(i))
            .collect();

        for (index, group) in &by_index {
            if *index >= expected as u64 {
                for entry in group {
                    report.out_of_range.push((*index, entry.file_name.clone()));
                }
            } else if group.len() > 1 {
                let mut names: Vec<String> = group.iter().map(|e| e.file_name.clone()).collect();
                names.sort();
                report.duplicates.push((*index, names));
            }
        }

        if !report.is_valid() {
            return Err(CollectError::InvalidSequence(report));
        }

        // Valid means one entry per key and keys are exactly 0..expected.
        let entries = by_index.into_values().flatten().collect();

        Ok(Self { directory, entries })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in frame order.
    pub fn entries(&self) -> &[FrameEntry] {
        &self.entries
    }

    /// File paths in frame order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|e| e.path.as_path())
    }

    /// Read every file in frame order into one buffer.
    ///
    /// The first unreadable file aborts the load.
    pub fn load(&self) -> CollectResult<FrameBuffer> {
        let mut buffer = FrameBuffer::default();

        for entry in &self.entries {
            let bytes = fs::read(&entry.path).map_err(|source| CollectError::ReadFile {
                path: entry.path.clone(),
                source,
            })?;
            tracing::trace!("Loaded frame {} ({} bytes)", entry.index, bytes.len());
            buffer.push_frame(&bytes);
        }

        tracing::info!(
            "Loaded {} frames ({} bytes) from {}",
            buffer.frame_count(),
            buffer.len(),
            self.directory.display()
        );

        Ok(buffer)
    }
}

/// Concatenated frame bytes with no delimiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    frame_sizes: Vec<usize>,
}

impl FrameBuffer {
    fn push_frame(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.frame_sizes.push(bytes.len());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_sizes.len()
    }

    /// Byte length of each frame, in frame order.
    pub fn frame_sizes(&self) -> &[usize] {
        &self.frame_sizes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Scan, validate and load `dir` in one step.
pub fn collect_frames(dir: impl AsRef<Path>) -> CollectResult<FrameBuffer> {
    ImageSet::scan(dir)?.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(index: u64, name: &str) -> FrameEntry {
        FrameEntry {
            index,
            file_name: name.to_string(),
            path: PathBuf::from("/frames").join(name),
        }
    }

    #[test]
    fn collects_in_index_order() {
        let dir = tempdir().unwrap();
        // Written out of order so listing order can't line up by accident.
        for i in [3u8, 0, 4, 2, 1] {
            fs::write(
                dir.path().join(format!("frame_{}.bin", i)),
                [0xA0 + i],
            )
            .unwrap();
        }

        let buffer = collect_frames(dir.path()).unwrap();
        assert_eq!(buffer.as_bytes(), &[0xA0, 0xA1, 0xA2, 0xA3, 0xA4]);
        assert_eq!(buffer.frame_count(), 5);
    }

    #[test]
    fn concatenates_whole_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b1.png"), b"world").unwrap();
        fs::write(dir.path().join("a0.png"), b"hello ").unwrap();
        fs::write(dir.path().join("c2.png"), b"").unwrap();

        let buffer = collect_frames(dir.path()).unwrap();
        assert_eq!(buffer.as_bytes(), b"hello world");
        assert_eq!(buffer.frame_sizes(), &[6, 5, 0]);
    }

    #[test]
    fn names_without_digits_are_excluded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("frame_0.bin"), [1u8]).unwrap();
        fs::write(dir.path().join("frame_1.bin"), [2u8]).unwrap();
        fs::write(dir.path().join("thumbnail.bin"), [9u8]).unwrap();

        let buffer = collect_frames(dir.path()).unwrap();
        assert_eq!(buffer.as_bytes(), &[1, 2]);
    }

    #[test]
    fn leading_zeros_parse_to_same_index() {
        let set = ImageSet::from_entries(
            "/frames",
            vec![entry(1, "f001.png"), entry(0, "f000.png")],
        )
        .unwrap();
        let names: Vec<&str> = set.entries().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["f000.png", "f001.png"]);
    }

    #[test]
    fn empty_directory_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        let result = ImageSet::scan(dir.path());
        assert!(matches!(result, Err(CollectError::Empty { .. })));
    }

    #[test]
    fn gap_is_reported_as_missing() {
        let result = ImageSet::from_entries(
            "/frames",
            vec![entry(0, "f0.png"), entry(2, "f2.png"), entry(1, "f1.png"), entry(4, "f4.png")],
        );

        let Err(CollectError::InvalidSequence(report)) = result else {
            panic!("expected invalid sequence");
        };
        assert_eq!(report.expected, 4);
        assert_eq!(report.missing, vec![3]);
        assert_eq!(report.out_of_range, vec![(4, "f4.png".to_string())]);
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn duplicates_are_reported() {
        let result = ImageSet::from_entries(
            "/frames",
            vec![entry(0, "b_0.png"), entry(0, "a_0.png"), entry(1, "c_1.png")],
        );

        let Err(CollectError::InvalidSequence(report)) = result else {
            panic!("expected invalid sequence");
        };
        assert_eq!(
            report.duplicates,
            vec![(0, vec!["a_0.png".to_string(), "b_0.png".to_string()])]
        );
        assert_eq!(report.missing, vec![2]);
    }

    #[test]
    fn index_past_count_does_not_panic() {
        let result = ImageSet::from_entries("/frames", vec![entry(1000, "f1000.png")]);

        let Err(CollectError::InvalidSequence(report)) = result else {
            panic!("expected invalid sequence");
        };
        assert_eq!(report.missing, vec![0]);
        assert_eq!(report.out_of_range, vec![(1000, "f1000.png".to_string())]);
    }

    #[test]
    fn unreadable_file_aborts_load() {
        let set = ImageSet::from_entries("/frames", vec![entry(0, "gone.png")]).unwrap();
        let result = set.load();
        assert!(matches!(result, Err(CollectError::ReadFile { .. })));
    }

    #[test]
    fn paths_follow_frame_order() {
        let set = ImageSet::from_entries(
            "/frames",
            vec![entry(1, "x1.png"), entry(0, "x0.png")],
        )
        .unwrap();
        let paths: Vec<&Path> = set.paths().collect();
        assert_eq!(
            paths,
            vec![Path::new("/frames/x0.png"), Path::new("/frames/x1.png")]
        );
        assert_eq!(set.directory(), Path::new("/frames"));
        assert_eq!(set.len(), 2);
    }
}
