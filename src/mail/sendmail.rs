// mail/sendmail.rs
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::time::{sleep, Duration};

use crate::config::Config;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;
const SEND_TIMEOUT_SECS: u64 = 15;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send failed: {0}")]
    Send(String),
}

#[derive(Debug, Clone)]
pub struct MailDelivery {
    pub provider_message_id: String,
}

/// Outbound email delivery, abstracted so tests can record sends instead
/// of talking to the provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<MailDelivery, MailError>;
}

/// Resend HTTP API mailer with bounded retries.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
}

impl ResendMailer {
    pub fn new(env: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .expect("failed to build the mailer HTTP client");

        ResendMailer {
            client,
            api_key: env.resend_api_key.clone(),
            from_email: env.from_email.clone(),
        }
    }

    async fn send_once(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<String, String> {
        let request_body = json!({
            "from": self.from_email,
            "to": to,
            "subject": subject,
            "html": html_body,
            "text": text_body,
        });

        let response = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "No response body".to_string());

        if status.is_success() {
            if let Ok(body) = serde_json::from_str::<serde_json::Value>(&response_text) {
                if let Some(id) = body.get("id").and_then(|v| v.as_str()) {
                    return Ok(id.to_string());
                }
            }
            Ok("success".to_string())
        } else {
            Err(format!(
                "Resend API error ({}): {}",
                status.as_u16(),
                response_text
            ))
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<MailDelivery, MailError> {
        if to.is_empty() {
            return Err(MailError::InvalidRecipient(
                "Email recipient cannot be empty".to_string(),
            ));
        }
        if !to.contains('@') {
            return Err(MailError::InvalidRecipient(format!(
                "Invalid email address: {}",
                to
            )));
        }

        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_once(to, subject, html_body, text_body).await {
                Ok(email_id) => {
                    tracing::info!("✓ Email sent successfully to {} (id: {})", to, email_id);
                    return Ok(MailDelivery {
                        provider_message_id: email_id,
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRIES {
                        let delay = RETRY_DELAY_MS * (2_u64.pow(attempt - 1));
                        tracing::warn!(
                            "Email send attempt {} failed for {}. Retrying in {}ms...",
                            attempt,
                            to,
                            delay
                        );
                        sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        let error_msg = last_error
            .map(|e| format!("Failed after {} retries: {}", MAX_RETRIES, e))
            .unwrap_or_else(|| "Unknown email sending error".to_string());

        tracing::error!("✗ Email failed for {}: {}", to, error_msg);
        Err(MailError::Send(error_msg))
    }
}
