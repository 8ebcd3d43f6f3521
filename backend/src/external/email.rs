//! Transactional email client (EmailJS REST API)
//!
//! One template is used for every lifecycle email; the subject and body are
//! passed as template variables.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmailConfig;

const PLACEHOLDER_SERVICE_ID: &str = "YOUR_SERVICE_ID";
const PLACEHOLDER_TEMPLATE_ID: &str = "YOUR_TEMPLATE_ID";
const PLACEHOLDER_PUBLIC_KEY: &str = "YOUR_PUBLIC_KEY";

/// Text returned when sending is disabled by placeholder configuration
pub const MOCKED_OK: &str = "MOCKED_OK";

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("email request failed: {0}")]
    Transport(String),

    #[error("email API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("email client setup failed: {0}")]
    Setup(String),
}

/// Template variables for a single email
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailParams {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub message: String,
    /// Extra variables some templates use (scrap type, slot, sender name, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl EmailParams {
    pub fn new(
        to_email: impl Into<String>,
        to_name: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            to_email: to_email.into(),
            to_name: to_name.into(),
            subject: subject.into(),
            message: message.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome reported by the email API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailReceipt {
    pub status: u16,
    pub text: String,
}

/// Anything that can deliver a templated email
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, params: &EmailParams) -> Result<EmailReceipt, NotificationError>;
}

#[derive(Serialize)]
struct SendPayload<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a EmailParams,
}

/// EmailJS client
#[derive(Clone)]
pub struct EmailJsClient {
    http_client: Client,
    api_url: String,
    service_id: String,
    template_id: String,
    public_key: String,
}

impl EmailJsClient {
    pub fn new(config: &EmailConfig) -> Result<Self, NotificationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotificationError::Setup(e.to_string()))?;

        Ok(Self {
            http_client,
            api_url: config.api_url.clone(),
            service_id: config.service_id.clone(),
            template_id: config.template_id.clone(),
            public_key: config.public_key.clone(),
        })
    }

    /// Sending is disabled while any credential is unset or still a placeholder
    pub fn is_configured(&self) -> bool {
        let usable = |value: &str, placeholder: &str| {
            let value = value.trim();
            !value.is_empty() && value != placeholder
        };
        usable(&self.service_id, PLACEHOLDER_SERVICE_ID)
            && usable(&self.template_id, PLACEHOLDER_TEMPLATE_ID)
            && usable(&self.public_key, PLACEHOLDER_PUBLIC_KEY)
    }
}

#[async_trait]
impl EmailSender for EmailJsClient {
    async fn send(&self, params: &EmailParams) -> Result<EmailReceipt, NotificationError> {
        if !self.is_configured() {
            tracing::debug!(to = %params.to_email, subject = %params.subject, "email sending disabled, skipping");
            return Ok(EmailReceipt {
                status: 200,
                text: MOCKED_OK.to_string(),
            });
        }

        let payload = SendPayload {
            service_id: &self.service_id,
            template_id: &self.template_id,
            user_id: &self.public_key,
            template_params: params,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if !status.is_success() {
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(EmailReceipt {
            status: status.as_u16(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(service_id: &str) -> EmailConfig {
        EmailConfig {
            api_url: "http://127.0.0.1:9/send".to_string(),
            service_id: service_id.to_string(),
            template_id: "template_abc".to_string(),
            public_key: "key_abc".to_string(),
        }
    }

    #[tokio::test]
    async fn test_placeholder_config_returns_mocked_ok() {
        let client = EmailJsClient::new(&config(PLACEHOLDER_SERVICE_ID)).unwrap();
        assert!(!client.is_configured());

        let receipt = client
            .send(&EmailParams::new("a@b.c", "A", "subject", "body"))
            .await
            .unwrap();
        assert_eq!(receipt, EmailReceipt { status: 200, text: MOCKED_OK.to_string() });
    }

    #[test]
    fn test_empty_config_counts_as_unconfigured() {
        let client = EmailJsClient::new(&config("  ")).unwrap();
        assert!(!client.is_configured());
        assert!(EmailJsClient::new(&config("service_real")).unwrap().is_configured());
    }

    #[test]
    fn test_extra_params_are_flattened() {
        let params = EmailParams::new("a@b.c", "A", "s", "m").with("pickup_slot", "May 2");
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["pickup_slot"], "May 2");
        assert_eq!(json["to_email"], "a@b.c");
    }
}
