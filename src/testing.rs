//! In-memory stand-ins for the external services a job talks to.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{TranscodeError, TranscodeResult};
use crate::hls::params::RenditionSpec;
use crate::infrastructure::process::ProcessRunner;
use crate::infrastructure::storage::{FileData, ObjectStore, StorageError, StoredObject};
use crate::modules::transcode::events::TranscodeOutcome;
use crate::notifications::NotificationSink;

pub fn ladder() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec {
            name: "360p".into(),
            width: 640,
            height: 360,
            video_bitrate: 800_000,
        },
        RenditionSpec {
            name: "720p".into(),
            width: 1280,
            height: 720,
            video_bitrate: 2_500_000,
        },
    ]
}

/// Encoder double. Writes a playlist and two segments per rendition unless
/// told to fail, hang until canceled, or panic for a given input.
pub struct ScriptedRunner {
    failing: HashSet<String>,
    hanging: HashSet<String>,
    panic_on_input: Option<String>,
    calls: Mutex<Vec<Vec<String>>>,
    started: watch::Sender<usize>,
    canceled: AtomicUsize,
}

impl ScriptedRunner {
    pub fn succeeding() -> Self {
        Self {
            failing: HashSet::new(),
            hanging: HashSet::new(),
            panic_on_input: None,
            calls: Mutex::new(Vec::new()),
            started: watch::Sender::new(0),
            canceled: AtomicUsize::new(0),
        }
    }

    pub fn failing<const N: usize>(renditions: [&str; N]) -> Self {
        let mut runner = Self::succeeding();
        runner.failing = renditions.iter().map(|s| s.to_string()).collect();
        runner
    }

    pub fn hanging<const N: usize>(mut self, renditions: [&str; N]) -> Self {
        self.hanging = renditions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn panicking_on(mut self, input_file_name: &str) -> Self {
        self.panic_on_input = Some(input_file_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn canceled_count(&self) -> usize {
        self.canceled.load(Ordering::SeqCst)
    }

    pub async fn wait_started(&self, count: usize) {
        let mut rx = self.started.subscribe();
        rx.wait_for(|n| *n >= count).await.unwrap();
    }
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).map(String::as_str)
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        _program: &Path,
        args: &[String],
        cancel: &CancellationToken,
    ) -> TranscodeResult<()> {
        self.calls.lock().unwrap().push(args.to_vec());
        self.started.send_modify(|n| *n += 1);

        if let (Some(marker), Some(input)) = (&self.panic_on_input, arg_after(args, "-i")) {
            if input.ends_with(marker.as_str()) {
                panic!("encoder exploded on {input}");
            }
        }

        let playlist = PathBuf::from(args.last().cloned().unwrap_or_default());
        let name = playlist
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        if self.hanging.contains(&name) {
            cancel.cancelled().await;
            self.canceled.fetch_add(1, Ordering::SeqCst);
            return Err(TranscodeError::Canceled);
        }

        if self.failing.contains(&name) {
            return Err(TranscodeError::execution_failed(
                "ffmpeg",
                "exited with exit status: 1",
            ));
        }

        let dir = playlist.parent().unwrap();
        tokio::fs::write(&playlist, format!("#EXTM3U\n#{name}\n")).await?;
        for seq in 0..2 {
            tokio::fs::write(dir.join(format!("{name}_{seq:03}.ts")), b"segment").await?;
        }
        Ok(())
    }
}

/// Object store kept in memory, with optional upload failure injection.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashSet<String>>,
    objects: Mutex<BTreeMap<(String, String), FileData>>,
    fail_puts_ending_with: Option<String>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    bucket_checks: AtomicUsize,
}

impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store.buckets.lock().unwrap().insert(bucket.to_string());
        store
    }

    pub fn failing_puts_ending_with(mut self, suffix: &str) -> Self {
        self.fail_puts_ending_with = Some(suffix.to_string());
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, content: &'static [u8]) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            FileData {
                content: Bytes::from_static(content),
                content_type: "video/mp4".into(),
                file_name: crate::infrastructure::storage::file_name_of(key).to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<FileData> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn bucket_checks(&self) -> usize {
        self.bucket_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        self.bucket_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.buckets.lock().unwrap().contains(bucket))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<FileData, StorageError> {
        if !self.buckets.lock().unwrap().contains(bucket) {
            return Err(StorageError::bucket_not_found(bucket));
        }
        self.object(bucket, key)
            .ok_or_else(|| StorageError::key_not_found(bucket, key))
    }

    async fn put_object(
        &self,
        file: FileData,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, StorageError> {
        if let Some(suffix) = &self.fail_puts_ending_with {
            if key.ends_with(suffix.as_str()) {
                return Err(StorageError::Upload(format!("injected failure for {key}")));
            }
        }
        self.puts.lock().unwrap().push(key.to_string());
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), file);
        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            location: format!("{bucket}/{key}"),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

/// Notification sink that remembers every outcome it was handed.
pub struct RecordingSink {
    outcomes: watch::Sender<Vec<TranscodeOutcome>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            outcomes: watch::Sender::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let sink = Self::new();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub fn outcomes(&self) -> Vec<TranscodeOutcome> {
        self.outcomes.borrow().clone()
    }

    pub async fn wait_for(&self, count: usize) -> Vec<TranscodeOutcome> {
        let mut rx = self.outcomes.subscribe();
        rx.wait_for(|o| o.len() >= count).await.unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, outcome: &TranscodeOutcome) -> TranscodeResult<()> {
        self.outcomes.send_modify(|o| o.push(outcome.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(TranscodeError::Notification("broker unavailable".into()));
        }
        Ok(())
    }
}
