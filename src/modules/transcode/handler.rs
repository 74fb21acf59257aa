use super::dto::{CancelJobResponse, EnqueueJobRequest, EnqueueJobResponse, HealthResponse};
use super::events::TranscodeJob;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::state::AppState;
use crate::workers::transcoder::WorkerState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

/// Queue a source video for HLS transcoding
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    request_body = EnqueueJobRequest,
    responses(
        (status = 202, description = "Job queued", body = ApiResponse<EnqueueJobResponse>),
        (status = 400, description = "Malformed request body")
    ),
    tag = "Jobs"
)]
pub async fn enqueue_job(
    State(state): State<AppState>,
    Json(payload): Json<EnqueueJobRequest>,
) -> impl IntoResponse {
    let job_id = payload.job_id.unwrap_or_else(Uuid::new_v4);
    let job = TranscodeJob::with_id(job_id, payload.bucket_name, payload.key, payload.base_url);

    info!(job_id = %job_id, bucket = %job.bucket_name, key = %job.key, "Job accepted");
    state.queue.enqueue(job);

    ApiSuccess(
        ApiResponse::success(EnqueueJobResponse { job_id }, "Job queued"),
        StatusCode::ACCEPTED,
    )
}

/// Cancel a running job. Unknown or finished ids are accepted and ignored.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Cancel request handled", body = ApiResponse<CancelJobResponse>)
    ),
    tag = "Jobs"
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    let canceled = state.registry.cancel(job_id);
    let message = if canceled {
        "Cancellation requested"
    } else {
        "No running job with this id"
    };

    ApiSuccess(
        ApiResponse::success(CancelJobResponse { job_id, canceled }, message),
        StatusCode::OK,
    )
}

/// Queue depth and worker status
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Worker is running", body = ApiResponse<HealthResponse>),
        (status = 503, description = "Worker is shutting down")
    ),
    tag = "Jobs"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let worker = *state.worker_state.borrow();
    if worker != WorkerState::Running {
        return ApiError(
            format!("Worker is {worker:?}").to_lowercase(),
            StatusCode::SERVICE_UNAVAILABLE,
        )
        .into_response();
    }

    let body = HealthResponse {
        queue_depth: state.queue.len(),
        active_jobs: state.registry.len(),
        worker,
    };
    ApiSuccess(ApiResponse::success(body, "ok"), StatusCode::OK).into_response()
}
