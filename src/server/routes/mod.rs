mod auth;
mod jobs;
mod users;

pub use auth::{forgot_password, register};
pub use jobs::{get_job, list_jobs};
pub use users::{count_users, create_user, list_users};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Internal failure surfaced to the client as an opaque 500.
pub(crate) struct InternalError(anyhow::Error);

impl IntoResponse for InternalError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for InternalError {
    fn from(e: anyhow::Error) -> Self {
        InternalError(e)
    }
}

impl From<serde_json::Error> for InternalError {
    fn from(e: serde_json::Error) -> Self {
        InternalError(e.into())
    }
}
