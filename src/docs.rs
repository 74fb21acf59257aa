use utoipa::OpenApi;
use crate::modules::transcode::dto::*;
use crate::workers::transcoder::WorkerState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::transcode::handler::enqueue_job,
        crate::modules::transcode::handler::cancel_job,
        crate::modules::transcode::handler::health,
    ),
    components(
        schemas(
            EnqueueJobRequest, EnqueueJobResponse, CancelJobResponse, HealthResponse,
            WorkerState,
        )
    ),
    tags(
        (name = "Jobs", description = "HLS transcoding jobs")
    )
)]
pub struct ApiDoc;
