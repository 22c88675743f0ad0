use super::JobHandler;
use crate::job_queue::models::{EmailVerificationPayload, JOB_TYPE_EMAIL_VERIFICATION};
use crate::mail::Mailer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub struct EmailVerificationHandler {
    mailer: Arc<dyn Mailer>,
}

impl EmailVerificationHandler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        EmailVerificationHandler { mailer }
    }
}

#[async_trait]
impl JobHandler for EmailVerificationHandler {
    fn job_type(&self) -> &'static str {
        JOB_TYPE_EMAIL_VERIFICATION
    }

    async fn execute(&self, payload: &str) -> Result<()> {
        let payload: EmailVerificationPayload =
            serde_json::from_str(payload).context("Invalid email verification payload")?;
        self.mailer
            .send_verification_email(
                &payload.email,
                &payload.name,
                &payload.token,
                payload.password.as_deref(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_verification_email(
            &self,
            email: &str,
            _name: &str,
            _token: &str,
            _password: Option<&str>,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(email.to_string());
            Ok(())
        }

        async fn send_forgot_password_email(
            &self,
            _email: &str,
            _name: &str,
            _token: &str,
        ) -> Result<()> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_executes_with_valid_payload() {
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let handler = EmailVerificationHandler::new(mailer.clone());

        let payload = json!({"email": "a@x.com", "name": "A", "token": "tok"}).to_string();
        handler.execute(&payload).await.unwrap();

        assert_eq!(*mailer.sent.lock().unwrap(), vec!["a@x.com".to_string()]);
    }

    #[tokio::test]
    async fn test_fails_on_malformed_payload() {
        let handler = EmailVerificationHandler::new(Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        }));
        assert!(handler.execute("not json").await.is_err());
        assert!(handler.execute("{\"email\": \"a@x.com\"}").await.is_err());
    }
}
