use std::sync::Arc;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use super::manifest::Manifest;
use super::params::{JobParameters, MASTER_PLAYLIST_NAME, threads_per_rendition};
use crate::error::{TranscodeError, TranscodeResult};
use crate::infrastructure::process::ProcessRunner;

/// Fans a source file out to one encoder per rendition and, when every
/// encode succeeds, writes the master playlist next to their outputs.
pub struct HlsCreator {
    runner: Arc<dyn ProcessRunner>,
    available_threads: usize,
}

impl HlsCreator {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            available_threads: num_cpus::get(),
        }
    }

    pub fn with_available_threads(mut self, threads: usize) -> Self {
        self.available_threads = threads;
        self
    }

    /// All-or-nothing: the master playlist exists only if this returns `Ok`.
    ///
    /// Returns [`TranscodeError::Canceled`] if `cancel` fired at any point,
    /// otherwise [`TranscodeError::PartialEncodeFailure`] if any rendition
    /// failed. Every launched encoder has exited by the time this returns.
    pub async fn create_renditions(
        &self,
        params: &JobParameters,
        cancel: &CancellationToken,
    ) -> TranscodeResult<Manifest> {
        if cancel.is_cancelled() {
            info!("Job was canceled before the encoders started");
            return Err(TranscodeError::Canceled);
        }

        tokio::fs::create_dir_all(&params.output_directory).await?;

        let total = params.renditions.len();
        if total == 0 {
            return Err(TranscodeError::PartialEncodeFailure {
                failed: 0,
                total,
                reason: "no renditions configured".into(),
            });
        }

        let threads = threads_per_rendition(self.available_threads, total);
        info!(renditions = total, threads, "🎞️ Starting rendition encodes");

        // Fires for the caller's signal too; a failing sibling also fires it.
        let phase = cancel.child_token();

        let encodes = params.renditions.iter().map(|rendition| {
            let args = params.encoder_args(rendition, threads);
            let phase = phase.clone();
            let runner = Arc::clone(&self.runner);

            async move {
                let result = runner.run(&params.encoder_path, &args, &phase).await;
                match &result {
                    Ok(()) => info!("Rendition encoded"),
                    Err(e) if e.is_canceled() => info!("Rendition encode canceled"),
                    Err(e) => {
                        warn!("Rendition encode failed: {}", e);
                        phase.cancel();
                    }
                }
                result
            }
            .instrument(info_span!("rendition", name = %rendition.name))
        });

        let results = join_all(encodes).await;

        if cancel.is_cancelled() {
            info!("Rendition phase canceled, skipping master playlist");
            return Err(TranscodeError::Canceled);
        }

        let errors: Vec<TranscodeError> = results.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            // Siblings stopped by a failing rendition are not failures themselves.
            let failed: Vec<&TranscodeError> = errors.iter().filter(|e| !e.is_canceled()).collect();
            let reason = failed.first().map_or_else(|| errors[0].to_string(), |e| e.to_string());
            return Err(TranscodeError::PartialEncodeFailure {
                failed: failed.len(),
                total,
                reason,
            });
        }

        let manifest = Manifest::new(&params.renditions);
        self.write_manifest(params, &manifest, cancel).await?;

        Ok(manifest)
    }

    async fn write_manifest(
        &self,
        params: &JobParameters,
        manifest: &Manifest,
        cancel: &CancellationToken,
    ) -> TranscodeResult<()> {
        let path = params.output_directory.join(MASTER_PLAYLIST_NAME);

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = tokio::fs::write(&path, manifest.render()) => Some(result),
        };

        match written {
            Some(Ok(())) => {
                info!(path = %path.display(), "Master playlist written");
                Ok(())
            }
            Some(Err(e)) => Err(e.into()),
            None => {
                info!("Master playlist write abandoned due to cancellation");
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %path.display(), "Failed to remove partial master playlist: {}", e);
                    }
                }
                Err(TranscodeError::Canceled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hls::params::RenditionSpec;
    use crate::testing::{ScriptedRunner, ladder};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn params(output: &Path) -> JobParameters {
        JobParameters {
            encoder_path: PathBuf::from("ffmpeg"),
            input_file: output.join("source.mp4"),
            output_directory: output.join("hls"),
            renditions: ladder(),
            segment_duration: 10,
            audio_bitrate: 128_000,
            extra_args: String::new(),
        }
    }

    fn creator(runner: &Arc<ScriptedRunner>) -> HlsCreator {
        HlsCreator::new(runner.clone()).with_available_threads(8)
    }

    #[tokio::test]
    async fn all_encodes_succeeding_writes_the_master_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let params = params(dir.path());

        let manifest = creator(&runner)
            .create_renditions(&params, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(runner.call_count(), 2);
        assert_eq!(manifest.entries().len(), 2);

        let master = std::fs::read_to_string(params.output_directory.join("master.m3u8")).unwrap();
        assert!(master.contains("BANDWIDTH=800000,RESOLUTION=640x360\n360p.m3u8"));
        assert!(master.contains("BANDWIDTH=2500000,RESOLUTION=1280x720\n720p.m3u8"));
        assert!(master.find("360p.m3u8").unwrap() < master.find("720p.m3u8").unwrap());
    }

    #[tokio::test]
    async fn each_encoder_gets_its_share_of_threads() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());

        creator(&runner)
            .create_renditions(&params(dir.path()), &CancellationToken::new())
            .await
            .unwrap();

        for args in runner.calls() {
            let idx = args.iter().position(|a| a == "-threads").unwrap();
            assert_eq!(args[idx + 1], "4");
        }
    }

    #[tokio::test]
    async fn one_failed_encode_fails_the_phase_without_a_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::failing(["720p"]));
        let params = params(dir.path());

        let err = creator(&runner)
            .create_renditions(&params, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            TranscodeError::PartialEncodeFailure { failed, total, .. } => {
                assert_eq!((failed, total), (1, 2));
            }
            other => panic!("expected PartialEncodeFailure, got {other:?}"),
        }
        assert!(!params.output_directory.join("master.m3u8").exists());
    }

    #[tokio::test]
    async fn failure_stops_slower_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::failing(["360p"]).hanging(["720p"]));

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            creator(&runner).create_renditions(&params(dir.path()), &CancellationToken::new()),
        )
        .await
        .expect("sibling should be stopped")
        .unwrap_err();

        assert!(matches!(err, TranscodeError::PartialEncodeFailure { failed: 1, .. }));
        assert_eq!(runner.canceled_count(), 1);
    }

    #[tokio::test]
    async fn pre_canceled_signal_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let params = params(dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = creator(&runner)
            .create_renditions(&params, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_canceled());
        assert_eq!(runner.call_count(), 0);
        assert!(!params.output_directory.join("master.m3u8").exists());
    }

    #[tokio::test]
    async fn cancel_mid_encode_stops_every_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding().hanging(["360p", "720p"]));
        let params = params(dir.path());
        let cancel = CancellationToken::new();

        let phase = {
            let creator = creator(&runner);
            let cancel = cancel.clone();
            let params = params.clone();
            tokio::spawn(async move { creator.create_renditions(&params, &cancel).await })
        };

        runner.wait_started(2).await;
        cancel.cancel();

        let err = phase.await.unwrap().unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(runner.canceled_count(), 2);
        assert!(!params.output_directory.join("master.m3u8").exists());
    }

    #[tokio::test]
    async fn empty_ladder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let mut params = params(dir.path());
        params.renditions = Vec::<RenditionSpec>::new();

        let err = creator(&runner)
            .create_renditions(&params, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::PartialEncodeFailure { total: 0, .. }));
    }
}
