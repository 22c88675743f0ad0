//! Outbound mail seam.
//!
//! Job handlers talk to a [`Mailer`] trait so the delivery mechanism stays
//! swappable; the default implementation only logs, which is also what the
//! e2e tests hook into with a recording double.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(
        &self,
        email: &str,
        name: &str,
        token: &str,
        password: Option<&str>,
    ) -> Result<()>;

    async fn send_forgot_password_email(&self, email: &str, name: &str, token: &str) -> Result<()>;
}

/// Mailer that writes deliveries to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification_email(
        &self,
        email: &str,
        name: &str,
        token: &str,
        password: Option<&str>,
    ) -> Result<()> {
        info!(
            "Sending verification email to {} ({}), token {}, generated password: {}",
            email,
            name,
            token,
            password.is_some()
        );
        Ok(())
    }

    async fn send_forgot_password_email(&self, email: &str, name: &str, token: &str) -> Result<()> {
        info!(
            "Sending password reset email to {} ({}), token {}",
            email, name, token
        );
        Ok(())
    }
}
