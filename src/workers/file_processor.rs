use std::ffi::OsStr;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::settings::HlsSettings;
use crate::error::{TranscodeError, TranscodeResult};
use crate::hls::creator::HlsCreator;
use crate::hls::params::{JobParameters, MASTER_PLAYLIST_NAME, PLAYLIST_EXTENSION, SEGMENT_EXTENSION};
use crate::hls::registry::CancellationRegistry;
use crate::infrastructure::storage::{FileData, ObjectStore, StorageError, file_name_of};
use crate::modules::transcode::events::{TranscodeJob, TranscodeOutcome};
use crate::notifications::NotificationSink;

const HLS_DIR: &str = "hls";
const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Runs one job end to end: fetch, encode, publish, notify, clean up.
pub struct FileProcessor {
    store: Arc<dyn ObjectStore>,
    notifier: Arc<dyn NotificationSink>,
    creator: HlsCreator,
    registry: CancellationRegistry,
    scratch_root: PathBuf,
    hls: HlsSettings,
}

impl FileProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn NotificationSink>,
        creator: HlsCreator,
        registry: CancellationRegistry,
        scratch_root: PathBuf,
        hls: HlsSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            creator,
            registry,
            scratch_root,
            hls,
        }
    }

    /// Every call ends with exactly one notification. Job failures are
    /// notified first and then returned so the caller can log them.
    pub async fn process(&self, job: &TranscodeJob, cancel: &CancellationToken) -> TranscodeResult<()> {
        let workspace = self.scratch_root.join(job.id.to_string());
        let signal = self.registry.register_linked(job.id, cancel);

        let result = AssertUnwindSafe(self.run(job, &workspace, &signal))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TranscodeError::from_panic(payload)));

        self.registry.unregister(job.id);
        remove_workspace(&workspace).await;

        let outcome = match &result {
            Ok(master_key) => TranscodeOutcome::completed(job, master_key.as_str()),
            Err(e) => TranscodeOutcome::failed(job, e.to_string()),
        };
        let notified = self.notifier.notify(&outcome).await;

        result?;
        notified
    }

    async fn run(
        &self,
        job: &TranscodeJob,
        workspace: &Path,
        signal: &CancellationToken,
    ) -> TranscodeResult<String> {
        let input_file = self.fetch_source(job, workspace).await?;

        let params = JobParameters {
            encoder_path: self.hls.ffmpeg_path.clone(),
            input_file,
            output_directory: workspace.join(HLS_DIR),
            renditions: self.hls.variants.clone(),
            segment_duration: self.hls.segment_duration,
            audio_bitrate: self.hls.audio_bitrate,
            extra_args: self.hls.extra_args.clone(),
        };

        let phase = self.creator.create_renditions(&params, signal).await;
        // Cancel requests arriving after the encode phase have nothing left to stop.
        self.registry.unregister(job.id);
        phase?;

        self.publish(job, &params.output_directory).await
    }

    async fn fetch_source(&self, job: &TranscodeJob, workspace: &Path) -> TranscodeResult<PathBuf> {
        info!("⬇️ Downloading source");
        let source = self.store.get_object(&job.bucket_name, &job.key).await?;

        let file_name = file_name_of(&job.key);
        if file_name.is_empty() {
            return Err(StorageError::key_not_found(&job.bucket_name, &job.key).into());
        }

        tokio::fs::create_dir_all(workspace).await?;
        let input_file = workspace.join(file_name);
        tokio::fs::write(&input_file, &source.content).await?;

        info!(file = %source.file_name, bytes = source.content.len(), "⬇️ Downloaded source");
        Ok(input_file)
    }

    /// Uploads every produced file, master playlist last. Returns the master key.
    async fn publish(&self, job: &TranscodeJob, output_dir: &Path) -> TranscodeResult<String> {
        let prefix = key_prefix(&job.key);
        let files = produced_files(output_dir).await?;

        let mut uploaded = Vec::with_capacity(files.len());
        if let Err(e) = self.upload_all(job, prefix, &files, &mut uploaded).await {
            self.rollback(&job.bucket_name, &uploaded).await;
            return Err(e);
        }

        info!(files = uploaded.len(), "⬆️ Published HLS output");
        Ok(hls_key(prefix, MASTER_PLAYLIST_NAME))
    }

    async fn upload_all(
        &self,
        job: &TranscodeJob,
        prefix: &str,
        files: &[PathBuf],
        uploaded: &mut Vec<String>,
    ) -> TranscodeResult<()> {
        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let key = hls_key(prefix, &file_name);
            let content = tokio::fs::read(path).await?;

            let file = FileData {
                content: Bytes::from(content),
                content_type: content_type_for(&file_name),
                file_name,
            };
            let stored = self.store.put_object(file, &job.bucket_name, &key).await?;
            debug!(location = %stored.location, "Uploaded");
            uploaded.push(key);
        }
        Ok(())
    }

    async fn rollback(&self, bucket: &str, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        warn!(objects = keys.len(), "Publish failed, removing uploaded objects");
        for key in keys {
            if let Err(e) = self.store.delete_object(bucket, key).await {
                warn!(key = %key, "Failed to remove uploaded object: {}", e);
            }
        }
    }
}

async fn produced_files(dir: &Path) -> TranscodeResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    let is_master = |p: &PathBuf| p.file_name() == Some(OsStr::new(MASTER_PLAYLIST_NAME));
    files.sort_by(|a, b| is_master(a).cmp(&is_master(b)).then_with(|| a.cmp(b)));

    if !files.last().is_some_and(is_master) {
        return Err(TranscodeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{MASTER_PLAYLIST_NAME} missing from {}", dir.display()),
        )));
    }
    Ok(files)
}

async fn remove_workspace(workspace: &Path) {
    match tokio::fs::remove_dir_all(workspace).await {
        Ok(()) => debug!(path = %workspace.display(), "Removed workspace"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %workspace.display(), "Failed to remove workspace: {}", e),
    }
}

/// Source key up to its last `/`, or empty for a top-level key.
pub fn key_prefix(key: &str) -> &str {
    key.rsplit_once('/').map_or("", |(prefix, _)| prefix)
}

pub fn hls_key(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        format!("{HLS_DIR}/{file_name}")
    } else {
        format!("{prefix}/{HLS_DIR}/{file_name}")
    }
}

pub fn content_type_for(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some(PLAYLIST_EXTENSION) => PLAYLIST_CONTENT_TYPE.to_string(),
        Some(SEGMENT_EXTENSION) => SEGMENT_CONTENT_TYPE.to_string(),
        _ => mime::APPLICATION_OCTET_STREAM.to_string(),
    }
}
