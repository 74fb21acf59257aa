use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work: one source video to turn into an HLS ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscodeJob {
    pub id: Uuid,
    pub bucket_name: String,
    pub key: String,
    pub base_url: String,
}

impl TranscodeJob {
    pub fn new(
        bucket_name: impl Into<String>,
        key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), bucket_name, key, base_url)
    }

    pub fn with_id(
        id: Uuid,
        bucket_name: impl Into<String>,
        key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            bucket_name: bucket_name.into(),
            key: key.into(),
            base_url: base_url.into(),
        }
    }
}

/// Result published once per job. Exactly one of `base_url` and `error` is set.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TranscodeOutcome {
    bucket_name: String,
    key: String,
    base_url: Option<String>,
    error: Option<String>,
}

impl TranscodeOutcome {
    /// `key` points at the published master playlist.
    pub fn completed(job: &TranscodeJob, key: impl Into<String>) -> Self {
        Self {
            bucket_name: job.bucket_name.clone(),
            key: key.into(),
            base_url: Some(job.base_url.clone()),
            error: None,
        }
    }

    /// `key` is the source key the job was created for.
    pub fn failed(job: &TranscodeJob, error: impl Into<String>) -> Self {
        Self {
            bucket_name: job.bucket_name.clone(),
            key: job.key.clone(),
            base_url: None,
            error: Some(error.into()),
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
