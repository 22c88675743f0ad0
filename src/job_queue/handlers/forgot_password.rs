use super::JobHandler;
use crate::job_queue::models::{ForgotPasswordPayload, JOB_TYPE_FORGOT_PASSWORD};
use crate::mail::Mailer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub struct ForgotPasswordHandler {
    mailer: Arc<dyn Mailer>,
}

impl ForgotPasswordHandler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        ForgotPasswordHandler { mailer }
    }
}

#[async_trait]
impl JobHandler for ForgotPasswordHandler {
    fn job_type(&self) -> &'static str {
        JOB_TYPE_FORGOT_PASSWORD
    }

    async fn execute(&self, payload: &str) -> Result<()> {
        let payload: ForgotPasswordPayload =
            serde_json::from_str(payload).context("Invalid forgot password payload")?;
        self.mailer
            .send_forgot_password_email(&payload.email, &payload.name, &payload.token)
            .await
    }
}
