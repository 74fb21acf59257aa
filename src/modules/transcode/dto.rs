use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::workers::transcoder::WorkerState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnqueueJobRequest {
    pub bucket_name: String,
    pub key: String,
    pub base_url: String,
    /// Optional caller-chosen id; generated when absent.
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnqueueJobResponse {
    pub job_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelJobResponse {
    pub job_id: Uuid,
    /// Whether a running job was signalled.
    pub canceled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub queue_depth: usize,
    pub active_jobs: usize,
    pub worker: WorkerState,
}
