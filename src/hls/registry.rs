use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Live cancellation signals of in-flight jobs, keyed by job id.
///
/// `cancel` and `unregister` both remove the entry atomically, so for the
/// same id whichever runs first wins and the other is a no-op.
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    tokens: Arc<DashMap<Uuid, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: Uuid) -> CancellationToken {
        self.insert(job_id, CancellationToken::new())
    }

    /// Like [`register`](Self::register), but the signal also fires when `parent` does.
    pub fn register_linked(&self, job_id: Uuid, parent: &CancellationToken) -> CancellationToken {
        self.insert(job_id, parent.child_token())
    }

    fn insert(&self, job_id: Uuid, token: CancellationToken) -> CancellationToken {
        if self.tokens.insert(job_id, token.clone()).is_some() {
            debug!(job_id = %job_id, "Replaced an existing cancellation entry");
        }
        token
    }

    /// Triggers and removes the job's signal. Returns whether a live entry existed.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.tokens.remove(&job_id) {
            Some((_, token)) => {
                info!(job_id = %job_id, "Cancelling job");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes the job's signal without triggering it.
    pub fn unregister(&self, job_id: Uuid) -> bool {
        self.tokens.remove(&job_id).is_some()
    }

    pub fn contains(&self, job_id: Uuid) -> bool {
        self.tokens.contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
