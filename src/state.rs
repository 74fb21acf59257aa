use tokio::sync::watch;

use crate::hls::registry::CancellationRegistry;
use crate::infrastructure::queue::job_queue::JobQueue;
use crate::workers::transcoder::WorkerState;

#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
    pub registry: CancellationRegistry,
    pub worker_state: watch::Receiver<WorkerState>,
}

impl AppState {
    pub fn new(
        queue: JobQueue,
        registry: CancellationRegistry,
        worker_state: watch::Receiver<WorkerState>,
    ) -> Self {
        Self {
            queue,
            registry,
            worker_state,
        }
    }
}
