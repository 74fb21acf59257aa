use async_channel::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::{TranscodeError, TranscodeResult};
use crate::modules::transcode::events::TranscodeJob;

/// In-process FIFO handoff from intake to the worker loop.
///
/// Unbounded: `enqueue` never waits on the consumer. Depth beyond
/// `warn_depth` is logged but never rejected.
#[derive(Clone)]
pub struct JobQueue {
    sender: Sender<TranscodeJob>,
    receiver: Receiver<TranscodeJob>,
    warn_depth: usize,
}

impl JobQueue {
    pub fn new(warn_depth: usize) -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self {
            sender,
            receiver,
            warn_depth,
        }
    }

    pub fn enqueue(&self, job: TranscodeJob) {
        let job_id = job.id;
        // Both ends live as long as the queue, so the channel cannot be closed here.
        if let Err(e) = self.sender.try_send(job) {
            error!(job_id = %job_id, "Failed to enqueue job: {}", e);
            return;
        }

        let depth = self.sender.len();
        if depth > self.warn_depth {
            warn!(depth, warn_depth = self.warn_depth, "Job queue is growing");
        }
    }

    /// Waits for the next job, or fails with `Canceled` once `cancel` fires.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> TranscodeResult<TranscodeJob> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranscodeError::Canceled),
            job = self.receiver.recv() => job.map_err(|_| TranscodeError::Canceled),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
