//! Video job: configuration, loaded frames and encoding.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collect::{count_frames, CollectError, FrameBuffer, ImageSet};
use crate::config::{EncoderSettings, JobDefaults};
use crate::encoder::{EncodeOutcome, EncodeParams, Encoder};
use crate::error::{Error, Result};
use crate::logging::JobLogger;

/// Everything needed to turn one image directory into one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Video file to write.
    pub output: PathBuf,
    /// Output resolution as `<width>x<height>`.
    pub size: String,
    /// Frames per second.
    pub fps: f64,
    /// Video bitrate in bits per second.
    pub bitrate: u64,
    /// Directory holding the numbered images.
    pub image_directory: PathBuf,
}

impl JobConfig {
    pub fn new(
        output: impl Into<PathBuf>,
        size: impl Into<String>,
        fps: f64,
        bitrate: u64,
        image_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            output: output.into(),
            size: size.into(),
            fps,
            bitrate,
            image_directory: image_directory.into(),
        }
    }

    /// Job for `image_directory` using configured defaults for the rest.
    pub fn from_defaults(image_directory: impl Into<PathBuf>, defaults: &JobDefaults) -> Self {
        Self::new(
            &defaults.output,
            &defaults.size,
            defaults.fps,
            defaults.bitrate,
            image_directory,
        )
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            size: self.size.clone(),
            fps: self.fps,
            bitrate: self.bitrate,
        }
    }
}

/// A job with its frames loaded.
///
/// Construction scans, validates and reads the whole image directory, so
/// a `VideoJob` always holds a complete frame buffer. Only the frame rate
/// can change afterwards.
pub struct VideoJob {
    config: JobConfig,
    encoder: Encoder,
    images: ImageSet,
    buffer: FrameBuffer,
}

impl VideoJob {
    /// Load the frames for `config`.
    pub fn new(config: JobConfig, encoder_settings: EncoderSettings) -> Result<Self> {
        let images = ImageSet::scan(&config.image_directory)?;
        let buffer = images.load()?;

        Ok(Self {
            config,
            encoder: Encoder::new(encoder_settings),
            images,
            buffer,
        })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Name for logs, taken from the image directory.
    pub fn name(&self) -> String {
        self.config
            .image_directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "img2video".to_string())
    }

    pub fn fps(&self) -> f64 {
        self.config.fps
    }

    pub fn set_fps(&mut self, fps: f64) {
        self.config.fps = fps;
    }

    pub fn image_set(&self) -> &ImageSet {
        &self.images
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Set the frame rate so the video lasts `seconds`.
    ///
    /// The rate is the number of numbered files currently in the image
    /// directory divided by `seconds`. Returns the new rate. Entries without
    /// a frame number, such as a readme or a subdirectory, are not counted.
    /// Zero seconds is rejected and leaves the rate unchanged.
    pub fn set_length(&mut self, seconds: u64) -> Result<f64> {
        if seconds == 0 {
            return Err(Error::invalid_argument(
                "video length must be at least 1 second",
            ));
        }

        let frames = count_frames(&self.config.image_directory)?;
        let fps = frames as f64 / seconds as f64;

        tracing::debug!(
            "{} frames over {}s gives {:.3} fps (was {:.3})",
            frames,
            seconds,
            fps,
            self.config.fps
        );

        self.config.fps = fps;
        Ok(fps)
    }

    /// List every entry in the image directory, sorted by path.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        list_directory(&self.config.image_directory).map_err(Error::from)
    }

    /// Run the encoder over the loaded frames and write the output file.
    pub fn encode(&self, logger: &JobLogger) -> Result<EncodeOutcome> {
        let params = self.config.encode_params();
        let outcome = self
            .encoder
            .encode(&self.buffer, &params, &self.config.output, logger)?;

        tracing::info!(
            "Encoder finished, wrote file to: {}",
            outcome.output_path.display()
        );

        Ok(outcome)
    }
}

fn list_directory(dir: &Path) -> std::result::Result<Vec<PathBuf>, CollectError> {
    let read_dir_error = |source: std::io::Error| CollectError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = fs::read_dir(dir)
        .map_err(read_dir_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_dir_error)?;
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncodeError;
    use tempfile::{tempdir, TempDir};

    fn frames_dir(count: usize) -> TempDir {
        let dir = tempdir().unwrap();
        for i in 0..count {
            fs::write(dir.path().join(format!("frame_{}.bin", i)), [i as u8]).unwrap();
        }
        dir
    }

    fn job_with_output(dir: &Path, output: PathBuf, settings: EncoderSettings) -> VideoJob {
        let config = JobConfig::new(output, "1920x1080", 25.0, 1_000_000, dir);
        VideoJob::new(config, settings).unwrap()
    }

    fn job(dir: &Path, settings: EncoderSettings) -> VideoJob {
        job_with_output(dir, PathBuf::from("unused.mp4"), settings)
    }

    #[test]
    fn new_loads_buffer_in_order() {
        let dir = frames_dir(5);
        let job = job(dir.path(), EncoderSettings::default());

        assert_eq!(job.buffer().as_bytes(), &[0, 1, 2, 3, 4]);
        assert_eq!(job.image_set().len(), 5);
        assert_eq!(job.encoder().settings().program, "ffmpeg");
    }

    #[test]
    fn new_propagates_collection_errors() {
        let dir = frames_dir(2);
        fs::write(dir.path().join("frame_5.bin"), [5u8]).unwrap();

        let config = JobConfig::new("out.mp4", "640x480", 30.0, 1_000, dir.path());
        let result = VideoJob::new(config, EncoderSettings::default());
        assert!(matches!(
            result,
            Err(Error::Collect(CollectError::InvalidSequence(_)))
        ));
    }

    #[test]
    fn set_length_divides_frames_by_seconds() {
        let dir = frames_dir(30);
        let mut job = job(dir.path(), EncoderSettings::default());

        assert_eq!(job.set_length(10).unwrap(), 3.0);
        assert_eq!(job.fps(), 3.0);
    }

    #[test]
    fn set_length_ignores_non_frame_entries() {
        let dir = frames_dir(30);
        fs::write(dir.path().join("readme"), b"notes").unwrap();
        fs::create_dir(dir.path().join("thumbs")).unwrap();
        let mut job = job(dir.path(), EncoderSettings::default());

        assert_eq!(job.set_length(10).unwrap(), 3.0);
    }

    #[test]
    fn set_length_zero_is_rejected() {
        let dir = frames_dir(30);
        let mut job = job(dir.path(), EncoderSettings::default());

        let result = job.set_length(0);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(job.fps(), 25.0);
    }

    #[test]
    fn set_length_recounts_directory() {
        let dir = frames_dir(4);
        let mut job = job(dir.path(), EncoderSettings::default());
        fs::write(dir.path().join("frame_4.bin"), [4u8]).unwrap();
        fs::write(dir.path().join("frame_5.bin"), [5u8]).unwrap();

        assert_eq!(job.set_length(2).unwrap(), 3.0);
        // Loaded frames are unchanged.
        assert_eq!(job.buffer().frame_count(), 4);
    }

    #[test]
    fn files_lists_every_entry() {
        let dir = frames_dir(2);
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let job = job(dir.path(), EncoderSettings::default());

        let files = job.files().unwrap();
        assert_eq!(
            files,
            vec![
                dir.path().join("frame_0.bin"),
                dir.path().join("frame_1.bin"),
                dir.path().join("notes.txt"),
            ]
        );
    }

    #[test]
    fn from_defaults_uses_configured_values() {
        let defaults = JobDefaults::default();
        let config = JobConfig::from_defaults("/frames", &defaults);

        assert_eq!(config.output, PathBuf::from("output.mp4"));
        assert_eq!(config.size, "1920x1080");
        assert_eq!(config.encode_params().bitrate, defaults.bitrate);
    }

    #[test]
    fn name_comes_from_directory() {
        let dir = frames_dir(1);
        let job = job(dir.path(), EncoderSettings::default());
        let expected = dir.path().file_name().unwrap().to_string_lossy();
        assert_eq!(job.name(), expected);
    }

    #[cfg(unix)]
    mod encoding {
        use super::*;
        use crate::logging::LogConfig;
        use std::os::unix::fs::PermissionsExt;

        fn encoder_script(dir: &Path, body: &str) -> EncoderSettings {
            let path = dir.join("fake-encoder");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            EncoderSettings {
                program: path.to_string_lossy().into_owned(),
                ..EncoderSettings::default()
            }
        }

        #[test]
        fn repeated_encodes_are_identical() {
            let frames = frames_dir(3);
            let work = tempdir().unwrap();
            let job = job_with_output(
                frames.path(),
                work.path().join("out.mp4"),
                encoder_script(work.path(), "exec cat"),
            );
            let logger = JobLogger::detached(job.name(), LogConfig::default());

            let first = job.encode(&logger).unwrap();
            let first_bytes = fs::read(&first.output_path).unwrap();
            let second = job.encode(&logger).unwrap();
            let second_bytes = fs::read(&second.output_path).unwrap();

            assert_eq!(first_bytes, second_bytes);
            assert_eq!(first_bytes, vec![0, 1, 2]);
        }

        #[test]
        fn failing_encoder_propagates_error() {
            let frames = frames_dir(3);
            let work = tempdir().unwrap();
            let job = job_with_output(
                frames.path(),
                work.path().join("out.mp4"),
                encoder_script(work.path(), "cat >/dev/null\nexit 1"),
            );
            let logger = JobLogger::detached(job.name(), LogConfig::default());

            let result = job.encode(&logger);

            assert!(matches!(
                result,
                Err(Error::Encode(EncodeError::ProcessFailed {
                    exit_code: Some(1),
                    ..
                }))
            ));
            assert!(!job.config().output.exists());
        }

        #[test]
        fn encoder_reading_partial_input_fails_the_job() {
            let frames = tempdir().unwrap();
            for i in 0..4u8 {
                let path = frames.path().join(format!("frame_{}.bin", i));
                fs::write(path, vec![i; 512 * 1024]).unwrap();
            }
            let work = tempdir().unwrap();
            let job = job_with_output(
                frames.path(),
                work.path().join("out.mp4"),
                encoder_script(work.path(), "head -c 1000 | wc -c\nexit 0"),
            );
            let logger = JobLogger::detached(job.name(), LogConfig::default());

            let result = job.encode(&logger);

            assert!(matches!(
                result,
                Err(Error::Encode(EncodeError::InputTruncated {
                    input_len: 2_097_152,
                    ..
                }))
            ));
            assert!(!job.config().output.exists());
        }

        #[test]
        fn recomputed_fps_reaches_encoder() {
            let frames = frames_dir(30);
            let work = tempdir().unwrap();
            // Echo the -r value back as the "video".
            let settings = encoder_script(
                work.path(),
                "cat >/dev/null\nwhile [ $# -gt 0 ]; do [ \"$1\" = -r ] && printf %s \"$2\"; shift; done",
            );
            let mut job = job_with_output(frames.path(), work.path().join("out.mp4"), settings);
            job.set_length(8).unwrap();

            let logger = JobLogger::detached(job.name(), LogConfig::default());
            let outcome = job.encode(&logger).unwrap();

            // 30 / 8 = 3.75, floored.
            assert_eq!(fs::read(&outcome.output_path).unwrap(), b"3");
        }
    }
}
