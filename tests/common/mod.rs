// Not every test binary uses every helper
#![allow(dead_code)]

pub mod server;

use anyhow::Result;
use async_trait::async_trait;
use boxdesk_server::mail::Mailer;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum SentMail {
    Verification { email: String, token: String },
    ForgotPassword { email: String, token: String },
}

/// Mailer double that records deliveries instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail_with: Option<&'static str>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_email(
        &self,
        email: &str,
        _name: &str,
        token: &str,
        _password: Option<&str>,
    ) -> Result<()> {
        if let Some(message) = self.fail_with {
            anyhow::bail!(message);
        }
        self.sent.lock().unwrap().push(SentMail::Verification {
            email: email.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }

    async fn send_forgot_password_email(&self, email: &str, _name: &str, token: &str) -> Result<()> {
        if let Some(message) = self.fail_with {
            anyhow::bail!(message);
        }
        self.sent.lock().unwrap().push(SentMail::ForgotPassword {
            email: email.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}
