use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const PLAYLIST_EXTENSION: &str = "m3u8";
pub const SEGMENT_EXTENSION: &str = "ts";
pub const MASTER_PLAYLIST_NAME: &str = "master.m3u8";

/// One entry of the rendition ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RenditionSpec {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "width must be greater than 0"))]
    pub width: u32,
    #[validate(range(min = 1, message = "height must be greater than 0"))]
    pub height: u32,
    #[validate(range(min = 1, message = "video bitrate must be greater than 0"))]
    pub video_bitrate: u32,
}

impl RenditionSpec {
    pub fn playlist_name(&self) -> String {
        format!("{}.{}", self.name, PLAYLIST_EXTENSION)
    }

    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d.{}", self.name, SEGMENT_EXTENSION)
    }
}

/// Everything one rendition phase needs, built fresh for each job.
#[derive(Debug, Clone)]
pub struct JobParameters {
    pub encoder_path: PathBuf,
    pub input_file: PathBuf,
    pub output_directory: PathBuf,
    pub renditions: Vec<RenditionSpec>,
    pub segment_duration: u32,
    pub audio_bitrate: u32,
    pub extra_args: String,
}

impl JobParameters {
    /// Encoder arguments for a single rendition.
    pub fn encoder_args(&self, rendition: &RenditionSpec, threads: usize) -> Vec<String> {
        let segment_template = self.output_directory.join(rendition.segment_pattern());
        let playlist_path = self.output_directory.join(rendition.playlist_name());

        let mut args: Vec<String> = vec![
            "-loglevel".into(),
            "info".into(),
            "-i".into(),
            path_arg(&self.input_file),
            "-vf".into(),
            format!("scale={}:{}", rendition.width, rendition.height),
            "-c:v".into(),
            "h264".into(),
            "-b:v".into(),
            rendition.video_bitrate.to_string(),
            "-preset".into(),
            "veryfast".into(),
            "-threads".into(),
            threads.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            self.audio_bitrate.to_string(),
            "-ac".into(),
            "2".into(),
        ];

        args.extend(self.extra_args.split_whitespace().map(String::from));

        args.extend([
            "-hls_time".into(),
            self.segment_duration.to_string(),
            "-hls_playlist_type".into(),
            "vod".into(),
            "-hls_segment_filename".into(),
            path_arg(&segment_template),
            "-f".into(),
            "hls".into(),
            path_arg(&playlist_path),
        ]);

        args
    }
}

/// Encoder threads per rendition so that all renditions together fit the host.
pub fn threads_per_rendition(available: usize, renditions: usize) -> usize {
    (available / renditions.max(1)).max(1)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
