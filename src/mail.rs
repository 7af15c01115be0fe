use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// A plain-text message ready to hand to a delivery provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Mailer
///
/// Outbound email collaborator. Delivery is fire-and-report: callers log a
/// failure and carry on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

pub type MailerState = Arc<dyn Mailer>;

/// ResendMailer
///
/// Delivers through the Resend HTTP API.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let payload = ResendPayload {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
        };
        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MailError::Delivery(format!("provider answered {}", response.status())))
        }
    }
}

/// NoopMailer
///
/// Used when no provider key is configured.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::debug!(to = %email.to, "email delivery disabled, dropping message");
        Ok(())
    }
}
