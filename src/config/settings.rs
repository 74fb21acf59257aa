use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use validator::Validate;

use crate::config::env::{self, EnvKey};
use crate::hls::params::RenditionSpec;

const DEFAULT_VARIANTS: &str = r#"[
    { "name": "360p", "width": 640, "height": 360, "video_bitrate": 800000 },
    { "name": "720p", "width": 1280, "height": 720, "video_bitrate": 2500000 }
]"#;

#[derive(Clone, Debug, Validate)]
pub struct AppConfig {
    pub server_port: u16,
    pub minio_url: String,
    pub aws_region: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub rabbitmq_url: String,
    pub notification_queue: String,
    pub scratch_root: PathBuf,
    #[validate(nested)]
    pub hls: HlsSettings,
    pub kill_grace: Duration,
    pub queue_warn_depth: usize,
}

/// Encoder settings shared read-only by every job.
#[derive(Clone, Debug, Validate)]
pub struct HlsSettings {
    pub ffmpeg_path: PathBuf,
    #[validate(range(min = 1, message = "segment duration must be greater than 0"))]
    pub segment_duration: u32,
    #[validate(range(min = 1, message = "audio bitrate must be greater than 0"))]
    pub audio_bitrate: u32,
    pub extra_args: String,
    #[validate(length(min = 1, message = "at least one variant is required"))]
    #[validate(nested)]
    pub variants: Vec<RenditionSpec>,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let variants = parse_variants(env::get(EnvKey::Variants).ok().as_deref())?;

        let config = Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            minio_url: env::get(EnvKey::MinioUrl).context("MINIO_ENDPOINT is not set")?,
            aws_region: env::get_or(EnvKey::AwsRegion, "us-east-1"),
            minio_access_key: env::get(EnvKey::MinioAccessKey)
                .context("AWS_ACCESS_KEY_ID is not set")?,
            minio_secret_key: env::get(EnvKey::MinioSecretKey)
                .context("AWS_SECRET_ACCESS_KEY is not set")?,
            rabbitmq_url: env::get(EnvKey::RabbitMqUrl).context("RABBITMQ_URL is not set")?,
            notification_queue: env::get_or(EnvKey::NotificationQueue, "transcoding_results"),
            scratch_root: PathBuf::from(env::get_or(EnvKey::ScratchRoot, ".tmp")),
            hls: HlsSettings {
                ffmpeg_path: PathBuf::from(env::get_or(EnvKey::FfmpegPath, "ffmpeg")),
                segment_duration: env::get_parsed(EnvKey::SegmentDuration, 10),
                audio_bitrate: env::get_parsed(EnvKey::AudioBitrate, 128_000),
                extra_args: env::get_or(EnvKey::ExtraEncoderArgs, ""),
                variants,
            },
            kill_grace: Duration::from_secs(env::get_parsed(EnvKey::KillGraceSecs, 5)),
            queue_warn_depth: env::get_parsed(EnvKey::QueueWarnDepth, 100),
        };

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Parses the rendition ladder from its JSON form, falling back to the
/// built-in 360p/720p ladder when unset.
pub fn parse_variants(raw: Option<&str>) -> Result<Vec<RenditionSpec>> {
    let raw = match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_VARIANTS,
    };

    serde_json::from_str(raw).context("HLS_VARIANTS is not a valid variant list")
}
