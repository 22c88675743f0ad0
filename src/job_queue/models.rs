use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const JOB_TYPE_EMAIL_VERIFICATION: &str = "EMAIL_VERIFICATION";
pub const JOB_TYPE_FORGOT_PASSWORD: &str = "FORGOT_PASSWORD";

/// Lifecycle state of a queued job.
///
/// PENDING -> PROCESSING -> COMPLETED | FAILED. Terminal states are never
/// left; a failed job stays failed until an operator intervenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<JobStatus> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One durable queue entry.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub payload: String,
    pub status: JobStatus,
    pub created_at: i64,
    pub attempts: i64,
    pub last_error: Option<String>,
}

/// Payload of an [`JOB_TYPE_EMAIL_VERIFICATION`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerificationPayload {
    pub email: String,
    pub name: String,
    pub token: String,
    /// Present only for invitation flows where a generated password is
    /// communicated alongside the verification link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Payload of a [`JOB_TYPE_FORGOT_PASSWORD`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordPayload {
    pub email: String,
    pub name: String,
    pub token: String,
}

/// Violations of the job lifecycle, surfaced by the completion paths.
#[derive(Debug, Error)]
pub enum JobStateError {
    #[error("Job {0} not found")]
    NotFound(String),
    #[error("Job {id} is {actual}, expected {expected}")]
    InvalidState {
        id: String,
        actual: &'static str,
        expected: &'static str,
    },
}
