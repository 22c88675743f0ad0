use super::InternalError;
use crate::job_queue::{Job, JobStatus};
use crate::server::state::ServerState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Operational visibility into the queue. Jobs are global, not tenant-owned.
pub async fn list_jobs(
    State(state): State<ServerState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Response, InternalError> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match JobStatus::from_db_str(s) {
            Some(status) => Some(status),
            None => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Unknown job status: {}", s) })),
                )
                    .into_response())
            }
        },
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let jobs: Vec<Job> = state.job_store.list(status, limit, offset)?;
    Ok(Json(jobs).into_response())
}

pub async fn get_job(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Response, InternalError> {
    match state.job_store.get_job(&id)? {
        Some(job) => Ok(Json(job).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Job not found" })),
        )
            .into_response()),
    }
}
