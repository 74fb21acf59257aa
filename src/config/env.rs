use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    MinioUrl,
    AwsRegion,
    MinioAccessKey,
    MinioSecretKey,
    RabbitMqUrl,
    NotificationQueue,
    ScratchRoot,
    FfmpegPath,
    SegmentDuration,
    AudioBitrate,
    ExtraEncoderArgs,
    Variants,
    KillGraceSecs,
    QueueWarnDepth,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::AwsRegion => "AWS_REGION",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::RabbitMqUrl => "RABBITMQ_URL",
            EnvKey::NotificationQueue => "NOTIFICATION_QUEUE",
            EnvKey::ScratchRoot => "SCRATCH_ROOT",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::SegmentDuration => "HLS_SEGMENT_DURATION",
            EnvKey::AudioBitrate => "HLS_AUDIO_BITRATE",
            EnvKey::ExtraEncoderArgs => "HLS_EXTRA_ARGS",
            EnvKey::Variants => "HLS_VARIANTS",
            EnvKey::KillGraceSecs => "ENCODER_KILL_GRACE_SECS",
            EnvKey::QueueWarnDepth => "QUEUE_WARN_DEPTH",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
