mod dispatcher;
pub mod handlers;
mod models;
mod schema;
mod store;

pub use dispatcher::JobDispatcher;
pub use models::{
    EmailVerificationPayload, ForgotPasswordPayload, Job, JobStateError, JobStatus,
    JOB_TYPE_EMAIL_VERIFICATION, JOB_TYPE_FORGOT_PASSWORD,
};
pub use store::{JobStore, SqliteJobStore};
