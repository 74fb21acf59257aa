use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use utoipa::ToSchema;

use super::file_processor::FileProcessor;
use crate::infrastructure::queue::job_queue::JobQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Running,
    Stopping,
    Stopped,
}

/// Single consumer of the job queue. Jobs run one at a time, in order.
pub struct TranscoderWorker {
    queue: JobQueue,
    processor: Arc<FileProcessor>,
    stop: CancellationToken,
    state: watch::Sender<WorkerState>,
}

impl TranscoderWorker {
    pub fn new(queue: JobQueue, processor: Arc<FileProcessor>, stop: CancellationToken) -> Self {
        Self {
            queue,
            processor,
            stop,
            state: watch::Sender::new(WorkerState::Running),
        }
    }

    pub fn state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Runs until the stop token fires. A job in flight at that point is
    /// canceled and awaited; jobs still queued are dropped.
    pub async fn run(self) {
        info!("🎥 Transcoder Worker listening for jobs");

        while let Ok(job) = self.queue.dequeue(&self.stop).await {
            let span = info_span!("job", job_id = %job.id, bucket = %job.bucket_name, key = %job.key);
            info!(parent: &span, "📦 Received transcoding job");

            let processor = Arc::clone(&self.processor);
            let stop = self.stop.clone();
            let mut handle = tokio::spawn(
                async move { processor.process(&job, &stop).await }.instrument(span.clone()),
            );

            let joined = tokio::select! {
                biased;
                joined = &mut handle => Some(joined),
                _ = self.stop.cancelled() => None,
            };
            let joined = match joined {
                Some(joined) => joined,
                None => {
                    self.set_state(WorkerState::Stopping);
                    info!(parent: &span, "Waiting for the current job to wind down");
                    handle.await
                }
            };

            match joined {
                Ok(Ok(())) => info!(parent: &span, "✅ Job completed successfully"),
                Ok(Err(e)) if e.is_canceled() => warn!(parent: &span, "🛑 Job canceled"),
                Ok(Err(e)) => error!(parent: &span, "❌ Job failed: {}", e),
                Err(e) => error!(parent: &span, "💥 Job task aborted: {}", e),
            }
        }

        self.set_state(WorkerState::Stopping);
        if !self.queue.is_empty() {
            warn!(abandoned = self.queue.len(), "Stopping with jobs still queued");
        }

        self.set_state(WorkerState::Stopped);
        info!("🎥 Transcoder Worker stopped");
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}
