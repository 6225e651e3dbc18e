//! Ordered image collection.
//!
//! Turns a directory of numbered image files into one contiguous byte
//! buffer. Each file's frame index is the first run of decimal digits in
//! its name; files without digits are ignored. The indexed files must
//! cover `0..N` exactly once, otherwise collection fails with a report of
//! every missing, duplicate and out-of-range index.

mod image_set;
mod scan;
mod types;

pub use image_set::{collect_frames, FrameBuffer, ImageSet};
pub use scan::{count_frames, frame_index, scan_directory};
pub use types::{CollectError, CollectResult, FrameEntry, SequenceReport};
