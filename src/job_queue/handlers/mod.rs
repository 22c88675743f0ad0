mod email_verification;
mod forgot_password;

pub use email_verification::EmailVerificationHandler;
pub use forgot_password::ForgotPasswordHandler;

use anyhow::Result;
use async_trait::async_trait;

/// Executor for one job type. An `Err` from [`JobHandler::execute`] fails the
/// job; it is never re-queued automatically.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn job_type(&self) -> &'static str;

    async fn execute(&self, payload: &str) -> Result<()>;
}
