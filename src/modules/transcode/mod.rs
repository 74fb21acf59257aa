use axum::Router;
use axum::routing::{delete, get, post};

use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handler::health))
        .route("/jobs", post(handler::enqueue_job))
        .route("/jobs/{id}", delete(handler::cancel_job))
}
